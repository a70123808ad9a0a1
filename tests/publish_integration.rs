//! Integration tests for the publishing engine.
//!
//! Every scenario runs against MockForge, which enforces the same
//! preconditions as the GitHub API (stale file hashes, existing refs,
//! empty pull requests).

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use govpub::core::config::{PublisherConfig, UpdatePolicy};
use govpub::core::document::{Document, DocumentKind};
use govpub::core::types::BranchName;
use govpub::forge::mock::{FailOn, MockForge, MockOperation};
use govpub::forge::{Forge, ForgeError};
use govpub::publish::{Actor, BatchRequest, PublishError, PublishRequest, Publisher};

fn at_1700() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
}

fn at_1701() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_001).unwrap()
}

fn config() -> PublisherConfig {
    PublisherConfig::for_repository("gov", "registry").unwrap()
}

fn alice() -> Actor {
    Actor::new("alice").with_display_name("Alice Liddell")
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

fn created_commits(forge: &MockForge) -> usize {
    forge
        .operations()
        .iter()
        .filter(|op| matches!(op, MockOperation::CreateCommit { .. }))
        .count()
}

// =============================================================================
// Single-document publishing
// =============================================================================

mod single {
    use super::*;

    #[tokio::test]
    async fn new_schema_lands_on_fresh_branch() {
        let forge = MockForge::new();
        let config = config().with_public_base_url("https://registry.example.org");
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = PublishRequest::new(Document::json(
            "address-v1",
            json!({"type": "object", "properties": {"street": {"type": "string"}}}),
        ));
        let outcome = publisher.publish_schema(request, &alice()).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.branch.as_str(), "schema/add-address-v1-1700000000000");
        assert_eq!(outcome.paths, vec!["schemas/address-v1.json".to_string()]);
        assert_eq!(
            outcome.public_urls,
            vec!["https://registry.example.org/schemas/address-v1.json".to_string()]
        );

        // The base branch is untouched; the document exists on the new branch.
        assert!(forge.tree_paths("main").is_empty());
        let bytes = forge
            .read_file(outcome.branch.as_str(), "schemas/address-v1.json")
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "object");

        let published = forge
            .get_file("schemas/address-v1.json", &outcome.branch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.content_sha, Some(published.sha));

        let prs = forge.pull_requests();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].head, outcome.branch.as_str());
        assert_eq!(prs[0].base, "main");
        assert_eq!(prs[0].title, "Add Schema: address-v1");
        assert_eq!(outcome.pull_request.number, prs[0].number);

        let body = prs[0].body.clone().unwrap();
        assert!(body.contains("schemas/address-v1.json"));
        assert!(body.contains("Alice Liddell (@alice)"));
        assert!(body.contains("https://registry.example.org/schemas/address-v1.json"));
    }

    #[tokio::test]
    async fn update_with_current_hash() {
        let forge = MockForge::new()
            .with_files(&[("vocabulary/given-name.json", b"{\"id\": \"given-name\"}\n".as_slice())]);
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let current = forge
            .get_file("vocabulary/given-name.json", &main_branch())
            .await
            .unwrap()
            .unwrap();

        let request = PublishRequest::new(Document::json(
            "given-name",
            json!({"id": "given-name", "label": "Given name"}),
        ))
        .updating("given-name")
        .with_expected_sha(current.sha.clone());
        let outcome = publisher
            .publish_vocabulary_term(request, &alice())
            .await
            .unwrap();

        assert_eq!(
            outcome.branch.as_str(),
            "vocab/update-given-name-1700000000000"
        );
        assert_ne!(outcome.content_sha, Some(current.sha.clone()));
        assert_eq!(forge.pull_requests()[0].title, "Update Vocabulary Term: given-name");

        // The write carried the hash the caller saw.
        assert!(forge.operations().iter().any(|op| matches!(
            op,
            MockOperation::PutFile { sha: Some(sha), .. } if *sha == current.sha
        )));
    }

    #[tokio::test]
    async fn stale_hash_is_a_conflict() {
        let forge = MockForge::new().with_files(&[("schemas/address-v1.json", b"{}\n".as_slice())]);
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let seen = forge
            .get_file("schemas/address-v1.json", &main_branch())
            .await
            .unwrap()
            .unwrap();
        forge.advance_branch("main", "schemas/address-v1.json", Some(b"{\"v\": 2}\n".as_slice()));

        let request = PublishRequest::new(Document::json("address-v1", json!({"v": 3})))
            .with_expected_sha(seen.sha);
        let err = publisher.publish_schema(request, &alice()).await.unwrap_err();

        assert!(matches!(err, PublishError::Conflict(_)));
        assert_eq!(err.kind(), "conflict");
        assert_eq!(forge.branches(), vec!["main".to_string()]);
        assert!(forge.pull_requests().is_empty());
    }

    #[tokio::test]
    async fn strict_policy_requires_hash_for_existing_file() {
        let forge = MockForge::new().with_files(&[("mappings/eu-to-us.json", b"{}\n".as_slice())]);
        let config = config().with_update_policy(UpdatePolicy::Strict);
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = PublishRequest::new(Document::json("eu-to-us", json!({"map": []})));
        let err = publisher.publish_mapping(request, &alice()).await.unwrap_err();
        assert!(matches!(err, PublishError::Conflict(_)));
        assert!(!forge.operations().iter().any(MockOperation::is_write));
    }

    #[tokio::test]
    async fn advisory_policy_overwrites_existing_file() {
        let forge = MockForge::new().with_files(&[("mappings/eu-to-us.json", b"{}\n".as_slice())]);
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = PublishRequest::new(Document::json("eu-to-us", json!({"map": []})));
        let outcome = publisher.publish_mapping(request, &alice()).await.unwrap();
        assert_eq!(
            outcome.branch.as_str(),
            "mapping/update-eu-to-us-1700000000000"
        );
    }

    #[tokio::test]
    async fn identical_content_is_rejected() {
        let forge = MockForge::new().with_files(&[("entities/acme.json", b"{\n  \"id\": \"acme\"\n}\n".as_slice())]);
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = PublishRequest::new(Document::json("acme", json!({"id": "acme"})));
        let err = publisher
            .publish_entity_statement(request, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Validation(_)));
        assert_eq!(forge.branches(), vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn update_of_missing_document_is_a_conflict() {
        let forge = MockForge::new();
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request =
            PublishRequest::new(Document::json("vct-x", json!({}))).updating("vct-x");
        let err = publisher
            .publish_credential_type(request, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Conflict(_)));
    }

    #[tokio::test]
    async fn asset_published_verbatim() {
        let forge = MockForge::new();
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let png = vec![0x89, b'P', b'N', b'G', 0, 1, 2];
        let request = PublishRequest::new(Document::binary("acme.png", png.clone()));
        let outcome = publisher
            .publish_asset("logo", request, &alice())
            .await
            .unwrap();

        assert_eq!(
            outcome.branch.as_str(),
            "asset/logo/add-acme-png-1700000000000"
        );
        assert_eq!(
            forge.read_file(outcome.branch.as_str(), "assets/logo/acme.png"),
            Some(png)
        );
    }

    #[tokio::test]
    async fn validation_happens_before_any_host_call() {
        let forge = MockForge::new();
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = PublishRequest::new(Document::json("../escape", json!({})));
        let err = publisher.publish_schema(request, &alice()).await.unwrap_err();

        assert!(matches!(err, PublishError::Validation(_)));
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn distinct_timestamps_give_distinct_branches() {
        let forge = MockForge::new();
        let config = config();

        let first = Publisher::new(&forge, &config)
            .with_clock(at_1700)
            .publish_schema(
                PublishRequest::new(Document::json("address-v1", json!({"v": 1}))),
                &alice(),
            )
            .await
            .unwrap();
        let second = Publisher::new(&forge, &config)
            .with_clock(at_1701)
            .publish_schema(
                PublishRequest::new(Document::json("address-v1", json!({"v": 1}))),
                &alice(),
            )
            .await
            .unwrap();

        assert_ne!(first.branch, second.branch);
        assert_eq!(forge.pull_requests().len(), 2);
    }

    #[tokio::test]
    async fn same_millisecond_collides() {
        let forge = MockForge::new();
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        publisher
            .publish_schema(
                PublishRequest::new(Document::json("address-v1", json!({"v": 1}))),
                &alice(),
            )
            .await
            .unwrap();
        let err = publisher
            .publish_schema(
                PublishRequest::new(Document::json("address-v1", json!({"v": 2}))),
                &alice(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Conflict(_)));
        assert_eq!(forge.pull_requests().len(), 1);
    }

    #[tokio::test]
    async fn pinned_base_branch_skips_repository_lookup() {
        let forge = MockForge::new().with_branch("release");
        let config = config().with_base_branch(BranchName::new("release").unwrap());
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        publisher
            .publish_schema(
                PublishRequest::new(Document::json("address-v1", json!({}))),
                &alice(),
            )
            .await
            .unwrap();

        assert_eq!(forge.pull_requests()[0].base, "release");
        assert!(!forge.operations().contains(&MockOperation::GetRepository));
    }

    #[tokio::test]
    async fn default_branch_discovered_from_repository() {
        let forge = MockForge::with_default_branch("trunk");
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        publisher
            .publish_schema(
                PublishRequest::new(Document::json("address-v1", json!({}))),
                &alice(),
            )
            .await
            .unwrap();

        assert_eq!(forge.pull_requests()[0].base, "trunk");
        assert_eq!(forge.operations()[0], MockOperation::GetRepository);
    }
}

// =============================================================================
// Atomic batch publishing
// =============================================================================

mod batch {
    use super::*;

    fn term(id: &str) -> Document {
        Document::json(id, json!({"id": id, "label": id.to_uppercase()}))
    }

    #[tokio::test]
    async fn three_terms_one_commit_one_pull_request() {
        let forge = MockForge::new().with_files(&[
            ("vocabulary/keep.json", b"{\"id\": \"keep\"}\n".as_slice()),
            ("schemas/address-v1.json", b"{}\n".as_slice()),
        ]);
        let base_head = forge.branch_head("main").unwrap();
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = BatchRequest::new(
            DocumentKind::VocabularyTerm,
            vec![term("given-name"), term("family-name"), term("birth-date")],
        );
        let outcome = publisher.publish_batch(request, &alice()).await.unwrap();

        assert_eq!(
            outcome.branch.as_str(),
            "vocab/update-vocabulary-terms-1700000000000"
        );
        assert_eq!(created_commits(&forge), 1);
        assert_eq!(forge.pull_requests().len(), 1);
        assert_eq!(
            forge.pull_requests()[0].title,
            "Update 3 Vocabulary Terms"
        );

        let commit = forge.commit(&outcome.commit).unwrap();
        assert_eq!(commit.parents, vec![base_head]);
        assert_eq!(
            commit.message,
            "Update 3 Vocabulary Terms (first: given-name)"
        );

        // Untouched paths survive the overlay tree.
        assert_eq!(
            forge.tree_paths(outcome.branch.as_str()),
            vec![
                "schemas/address-v1.json".to_string(),
                "vocabulary/birth-date.json".to_string(),
                "vocabulary/family-name.json".to_string(),
                "vocabulary/given-name.json".to_string(),
                "vocabulary/keep.json".to_string(),
            ]
        );
        assert_eq!(forge.tree_paths("main").len(), 2);

        // ...and keep their exact bytes.
        for path in ["schemas/address-v1.json", "vocabulary/keep.json"] {
            assert_eq!(
                forge.read_file(outcome.branch.as_str(), path),
                forge.read_file("main", path),
                "{} changed",
                path
            );
        }
        assert_eq!(
            forge.read_file(outcome.branch.as_str(), "vocabulary/keep.json").unwrap(),
            b"{\"id\": \"keep\"}\n"
        );
    }

    #[tokio::test]
    async fn batch_matching_base_is_rejected() {
        let forge = MockForge::new()
            .with_files(&[("vocabulary/a.json", b"{\n  \"id\": \"a\"\n}\n".as_slice())]);
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = BatchRequest::new(
            DocumentKind::VocabularyTerm,
            vec![Document::json("a", json!({"id": "a"}))],
        );
        let err = publisher.publish_batch(request, &alice()).await.unwrap_err();

        assert!(matches!(err, PublishError::Validation(_)));
        assert_eq!(created_commits(&forge), 0);
        assert_eq!(forge.branches(), vec!["main".to_string()]);
        assert!(forge.pull_requests().is_empty());
    }

    #[tokio::test]
    async fn removing_a_missing_document_is_a_conflict() {
        let forge = MockForge::new();
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = BatchRequest::new(DocumentKind::VocabularyTerm, vec![term("b")])
            .with_deletions(vec!["ghost".to_string()]);
        let err = publisher.publish_batch(request, &alice()).await.unwrap_err();

        assert!(matches!(err, PublishError::Conflict(_)));
        assert!(err.to_string().contains("vocabulary/ghost.json"));
        assert!(!forge.operations().iter().any(MockOperation::is_write));
        assert_eq!(forge.branches(), vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn deletions_remove_paths_in_the_same_commit() {
        let forge = MockForge::new().with_files(&[
            ("vocabulary/old.json", b"{\"id\": \"old\"}\n".as_slice()),
            ("vocabulary/keep.json", b"{\"id\": \"keep\"}\n".as_slice()),
        ]);
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = BatchRequest::new(DocumentKind::VocabularyTerm, vec![term("new")])
            .with_deletions(vec!["old".to_string()])
            .with_slug("Spring cleanup");
        let outcome = publisher.publish_batch(request, &alice()).await.unwrap();

        assert_eq!(
            outcome.branch.as_str(),
            "vocab/update-spring-cleanup-1700000000000"
        );
        assert_eq!(
            forge.tree_paths(outcome.branch.as_str()),
            vec![
                "vocabulary/keep.json".to_string(),
                "vocabulary/new.json".to_string(),
            ]
        );
        assert!(outcome.paths.contains(&"vocabulary/old.json".to_string()));
        assert!(forge.read_file("main", "vocabulary/old.json").is_some());

        let body = forge.pull_requests()[0].body.clone().unwrap();
        assert!(body.contains("`vocabulary/old.json` (removed)"));
    }

    #[tokio::test]
    async fn pull_request_failure_leaves_branch() {
        let forge = MockForge::new().fail_on(FailOn::CreatePr(ForgeError::RateLimited));
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = BatchRequest::new(DocumentKind::VocabularyTerm, vec![term("a"), term("b")]);
        let err = publisher.publish_batch(request, &alice()).await.unwrap_err();

        assert_eq!(err.kind(), "pull_request_failed");
        let orphan = err.orphaned_branch().unwrap().to_string();
        assert!(forge.branches().contains(&orphan));
        assert!(forge.pull_requests().is_empty());
    }

    #[tokio::test]
    async fn blob_failure_creates_no_branch() {
        let forge = MockForge::new().fail_on(FailOn::CreateBlob(ForgeError::ApiError {
            status: 500,
            message: "boom".into(),
        }));
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = BatchRequest::new(DocumentKind::VocabularyTerm, vec![term("a"), term("b")]);
        let err = publisher.publish_batch(request, &alice()).await.unwrap_err();

        assert!(matches!(err, PublishError::Host(_)));
        assert!(err.orphaned_branch().is_none());
        assert_eq!(forge.branches(), vec!["main".to_string()]);
        assert_eq!(created_commits(&forge), 0);
    }

    #[tokio::test]
    async fn commit_failure_creates_no_branch() {
        let forge =
            MockForge::new().fail_on(FailOn::CreateCommit(ForgeError::NetworkError("reset".into())));
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let request = BatchRequest::new(DocumentKind::EntityStatement, vec![term("acme")]);
        assert!(publisher.publish_batch(request, &alice()).await.is_err());
        assert_eq!(forge.branches(), vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn empty_and_duplicate_batches_rejected_locally() {
        let forge = MockForge::new();
        let config = config();
        let publisher = Publisher::new(&forge, &config).with_clock(at_1700);

        let empty = BatchRequest::new(DocumentKind::VocabularyTerm, Vec::new());
        assert!(matches!(
            publisher.publish_batch(empty, &alice()).await,
            Err(PublishError::Validation(_))
        ));

        let duplicate = BatchRequest::new(DocumentKind::VocabularyTerm, vec![term("a")])
            .with_deletions(vec!["a".to_string()]);
        assert!(matches!(
            publisher.publish_batch(duplicate, &alice()).await,
            Err(PublishError::Validation(_))
        ));

        assert!(forge.operations().is_empty());
    }
}
