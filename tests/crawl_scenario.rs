//! End-to-end crawl tests against in-memory repository and index fakes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate_indexer::error::{AppError, Result};
use crate_indexer::graph::Vocabulary;
use crate_indexer::models::{Config, CrateRef, FetchErrorPolicy, License};
use crate_indexer::pipeline::{IndexWriter, Indexer};
use crate_indexer::services::{Repository, SearchIndex};
use crate_indexer::storage::{DiagnosticSink, DiagnosticStage};

const COLLECTION: &str = "https://w3id.org/ldac/profile#Collection";
const OBJECT: &str = "https://w3id.org/ldac/profile#Object";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryRepository {
    listings: HashMap<String, Vec<CrateRef>>,
    crates: HashMap<String, Value>,
    files: HashMap<(String, String), String>,
    file_requests: Mutex<Vec<(String, String)>>,
}

fn listing_key(member_of: Option<&str>, conforms_to: &str) -> String {
    format!("{}|{}", member_of.unwrap_or(""), conforms_to)
}

impl MemoryRepository {
    fn list(mut self, member_of: Option<&str>, conforms_to: &str, ids: &[&str]) -> Self {
        let refs = ids
            .iter()
            .map(|id| {
                let mut crate_ref = CrateRef::new(*id);
                crate_ref.types = vec!["Dataset".into()];
                crate_ref.record_name = Some(id.to_string());
                crate_ref
            })
            .collect();
        self.listings
            .insert(listing_key(member_of, conforms_to), refs);
        self
    }

    fn with_crate(mut self, id: &str, document: Value) -> Self {
        self.crates.insert(id.to_string(), document);
        self
    }

    fn with_file(mut self, item_id: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((item_id.to_string(), path.to_string()), content.to_string());
        self
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_objects(
        &self,
        member_of: Option<&str>,
        conforms_to: &str,
    ) -> Result<Vec<CrateRef>> {
        Ok(self
            .listings
            .get(&listing_key(member_of, conforms_to))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_crate(&self, id: &str) -> Result<Value> {
        self.crates
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::fetch(id, "status 500: unavailable"))
    }

    async fn fetch_file(&self, item_id: &str, path: &str) -> Result<Option<String>> {
        self.file_requests
            .lock()
            .unwrap()
            .push((item_id.to_string(), path.to_string()));
        Ok(self
            .files
            .get(&(item_id.to_string(), path.to_string()))
            .cloned())
    }
}

#[derive(Default)]
struct MemoryIndex {
    documents: Mutex<BTreeMap<String, Value>>,
    writes: Mutex<usize>,
    rejected: HashSet<String>,
}

impl MemoryIndex {
    fn rejecting(ids: &[&str]) -> Self {
        Self {
            rejected: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        self.documents.lock().unwrap().clone()
    }

    fn document(&self, id: &str) -> Value {
        self.documents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| panic!("no document {id}"))
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self) -> Result<bool> {
        Ok(true)
    }

    async fn create(&self, _body: &Value) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, id: &str, document: &Value) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        if self.rejected.contains(id) {
            return Err(AppError::index(400, "mapper_parsing_exception"));
        }
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn delete(&self) -> Result<bool> {
        self.documents.lock().unwrap().clear();
        Ok(true)
    }
}

#[derive(Default)]
struct MemorySink {
    records: Mutex<Vec<(String, DiagnosticStage)>>,
}

impl MemorySink {
    fn stages(&self) -> Vec<(String, DiagnosticStage)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagnosticSink for MemorySink {
    async fn record(
        &self,
        crate_id: &str,
        stage: DiagnosticStage,
        _payload: &Value,
    ) -> Result<String> {
        self.records
            .lock()
            .unwrap()
            .push((crate_id.to_string(), stage));
        Ok(stage.file_name(crate_id))
    }
}

struct Harness {
    repository: Arc<MemoryRepository>,
    index: Arc<MemoryIndex>,
    sink: Arc<MemorySink>,
}

impl Harness {
    fn new(repository: MemoryRepository, index: MemoryIndex) -> Self {
        Self {
            repository: Arc::new(repository),
            index: Arc::new(index),
            sink: Arc::new(MemorySink::default()),
        }
    }

    fn indexer(&self, config: &Config) -> Indexer {
        let writer = IndexWriter::new(self.index.clone(), self.sink.clone());
        let vocabulary = Vocabulary::load(&config.vocabulary).unwrap();
        Indexer::new(config, self.repository.clone(), writer, vocabulary, None).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn config_with_default_license() -> Config {
    let mut config = Config::default();
    config.license.default = Some(License::new("#default"));
    config
}

/// Crate document with a public metadata license.
fn crate_doc(root: Value, extra: Vec<Value>) -> Value {
    let mut graph = vec![
        json!({
            "@id": "ro-crate-metadata.json",
            "@type": "CreativeWork",
            "about": {"@id": "./"},
            "license": {"@id": "#meta"}
        }),
        json!({
            "@id": "#meta",
            "@type": "CreativeWork",
            "name": "Metadata licence",
            "metadataIsPublic": true
        }),
        root,
    ];
    graph.extend(extra);
    json!({ "@context": "https://w3id.org/ro/crate/1.1/context", "@graph": graph })
}

fn collection(name: &str, member_of: Option<&str>) -> Value {
    let mut root = json!({
        "@id": "./",
        "@type": ["Dataset", "RepositoryCollection"],
        "name": name,
        "conformsTo": {"@id": COLLECTION}
    });
    if let Some(parent) = member_of {
        root["memberOf"] = json!({"@id": parent});
    }
    crate_doc(root, vec![])
}

fn object(name: &str, member_of: &str, license: Option<Value>) -> Value {
    let mut root = json!({
        "@id": "./",
        "@type": ["Dataset", "RepositoryObject"],
        "name": name,
        "conformsTo": {"@id": OBJECT},
        "memberOf": {"@id": member_of},
        "hasPart": [{"@id": "doc.txt"}],
        "indexableText": [{"@id": "doc.txt"}]
    });
    let mut extra = vec![json!({
        "@id": "doc.txt",
        "@type": "File",
        "name": "Transcript",
        "encodingFormat": "text/plain"
    })];
    if let Some(license) = license {
        root["license"] = json!({ "@id": license["@id"].clone() });
        extra.push(license);
    }
    crate_doc(root, extra)
}

/// Root collection -> sub-collection -> object -> file.
fn two_level_repository() -> MemoryRepository {
    MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,root"])
        .list(Some("arcp://name,root"), COLLECTION, &["arcp://name,sub"])
        .list(Some("arcp://name,sub"), OBJECT, &["arcp://name,obj"])
        .with_crate("arcp://name,root", collection("Root", None))
        .with_crate(
            "arcp://name,sub",
            collection("Sub", Some("arcp://name,root")),
        )
        .with_crate(
            "arcp://name,obj",
            object("Obj", "arcp://name,sub", None),
        )
        .with_file("arcp://name,obj", "doc.txt", "hello world")
}

const ROOT_DOC: &str = "arcp://name,root/arcp://name,root/arcp://name,root";
const SUB_DOC: &str = "arcp://name,root/arcp://name,sub/arcp://name,sub";
const OBJ_DOC: &str = "arcp://name,root/arcp://name,obj/arcp://name,obj";
const FILE_DOC: &str = "arcp://name,root/arcp://name,obj/doc.txt";

fn ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["@id"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_two_level_scenario_writes_four_documents() {
    let harness = Harness::new(two_level_repository(), MemoryIndex::default());
    let config = config_with_default_license();

    let stats = harness.indexer(&config).run().await.unwrap();

    let documents = harness.index.snapshot();
    assert_eq!(
        documents.keys().cloned().collect::<Vec<_>>(),
        vec![OBJ_DOC, FILE_DOC, ROOT_DOC, SUB_DOC]
    );
    assert_eq!(stats.collections, 2);
    assert_eq!(stats.objects, 1);
    assert_eq!(stats.files, 1);
    assert_eq!(stats.written(), 4);

    for document in documents.values() {
        assert_eq!(ids(&document["_root"]), vec!["arcp://name,root"]);
        assert_eq!(document["license"][0]["@id"], "#default");
        assert_eq!(document["_metadataIsPublic"], true);
        assert_eq!(document["_metadataLicense"]["id"], "#meta");
    }

    let root = harness.index.document(ROOT_DOC);
    assert_eq!(root["_isTopLevel"], "true");
    assert_eq!(root["_isOCFL"], "true");
    assert!(ids(&root["_memberOf"]).is_empty());
    assert!(ids(&root["_collectionStack"]).is_empty());
    assert!(root.get("hasPart").is_none());

    let sub = harness.index.document(SUB_DOC);
    assert!(sub.get("_isTopLevel").is_none());
    assert!(sub.get("memberOf").is_none());
    assert_eq!(sub["_isOCFL"], "true");
    assert_eq!(ids(&sub["_memberOf"]), vec!["arcp://name,root"]);
    assert_eq!(ids(&sub["_collectionStack"]), vec!["arcp://name,root"]);

    let obj = harness.index.document(OBJ_DOC);
    assert_eq!(obj["_isOCFL"], "true");
    assert_eq!(obj["_crateId"], "arcp://name,obj");
    assert_eq!(ids(&obj["_memberOf"]), vec!["arcp://name,sub"]);
    assert_eq!(
        ids(&obj["_collectionStack"]),
        vec!["arcp://name,root", "arcp://name,sub"]
    );
    assert_eq!(ids(&obj["_mainCollection"]), vec!["arcp://name,root"]);
    assert_eq!(ids(&obj["_subCollection"]), vec!["arcp://name,sub"]);

    let file = harness.index.document(FILE_DOC);
    assert_eq!(file["_isOCFL"], "false");
    assert_eq!(file["_text"], "hello world");
    assert!(file.get("_error").is_none());
    assert_eq!(file["_parent"]["@id"], "arcp://name,obj");
    assert_eq!(ids(&file["_memberOf"]), vec!["arcp://name,sub"]);
    assert_eq!(file["name"], json!([{"@value": "Transcript"}]));
}

#[tokio::test]
async fn test_crawl_is_idempotent() {
    let harness = Harness::new(two_level_repository(), MemoryIndex::default());
    let config = config_with_default_license();

    harness.indexer(&config).run().await.unwrap();
    let first = harness.index.snapshot();
    harness.indexer(&config).run().await.unwrap();
    let second = harness.index.snapshot();

    assert_eq!(*harness.index.writes.lock().unwrap(), 8);
    assert_eq!(first.len(), 4);
    for (id, document) in &first {
        assert_eq!(
            serde_json::to_string(document).unwrap(),
            serde_json::to_string(&second[id]).unwrap(),
            "document {id} changed between runs"
        );
    }
}

#[tokio::test]
async fn test_unlicensed_item_is_skipped_but_siblings_are_indexed() {
    let open = json!({"@id": "#open", "@type": "CreativeWork", "name": "Open"});
    let repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,root"])
        .list(
            Some("arcp://name,root"),
            OBJECT,
            &["arcp://name,bare", "arcp://name,licensed"],
        )
        .with_crate("arcp://name,root", {
            let mut doc = collection("Root", None);
            doc["@graph"][2]["license"] = json!({"@id": "#open"});
            doc["@graph"].as_array_mut().unwrap().push(open.clone());
            doc
        })
        .with_crate(
            "arcp://name,bare",
            object("Bare", "arcp://name,root", None),
        )
        .with_crate(
            "arcp://name,licensed",
            object("Licensed", "arcp://name,root", Some(open)),
        );
    let harness = Harness::new(repository, MemoryIndex::default());

    let stats = harness.indexer(&Config::default()).run().await.unwrap();

    let documents = harness.index.snapshot();
    assert!(documents.contains_key(ROOT_DOC));
    assert!(documents.contains_key("arcp://name,root/arcp://name,licensed/arcp://name,licensed"));
    assert!(documents.contains_key("arcp://name,root/arcp://name,licensed/doc.txt"));
    assert!(documents.keys().all(|id| !id.contains("arcp://name,bare")));
    assert_eq!(documents.len(), 3);
    assert_eq!(stats.skipped, 1);
}

#[tokio::test]
async fn test_sibling_branches_get_their_own_stacks() {
    let repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,root"])
        .list(
            Some("arcp://name,root"),
            COLLECTION,
            &["arcp://name,left", "arcp://name,right"],
        )
        .list(Some("arcp://name,left"), OBJECT, &["arcp://name,l-obj"])
        .list(Some("arcp://name,right"), OBJECT, &["arcp://name,r-obj"])
        .with_crate("arcp://name,root", collection("Root", None))
        .with_crate(
            "arcp://name,left",
            collection("Left", Some("arcp://name,root")),
        )
        .with_crate(
            "arcp://name,right",
            collection("Right", Some("arcp://name,root")),
        )
        .with_crate(
            "arcp://name,l-obj",
            object("L", "arcp://name,left", None),
        )
        .with_crate(
            "arcp://name,r-obj",
            object("R", "arcp://name,right", None),
        );
    let harness = Harness::new(repository, MemoryIndex::default());

    harness
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();

    let left = harness
        .index
        .document("arcp://name,root/arcp://name,l-obj/arcp://name,l-obj");
    let right = harness
        .index
        .document("arcp://name,root/arcp://name,r-obj/arcp://name,r-obj");
    assert_eq!(
        ids(&left["_collectionStack"]),
        vec!["arcp://name,root", "arcp://name,left"]
    );
    assert_eq!(
        ids(&right["_collectionStack"]),
        vec!["arcp://name,root", "arcp://name,right"]
    );
}

#[tokio::test]
async fn test_text_index_forbidden_by_license() {
    let closed = json!({
        "@id": "#closed",
        "@type": "CreativeWork",
        "name": "Closed",
        "allowTextIndex": false
    });
    let repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,root"])
        .list(Some("arcp://name,root"), OBJECT, &["arcp://name,obj"])
        .with_crate("arcp://name,root", collection("Root", None))
        .with_crate(
            "arcp://name,obj",
            object("Obj", "arcp://name,root", Some(closed)),
        )
        .with_file("arcp://name,obj", "doc.txt", "secret");
    let harness = Harness::new(repository, MemoryIndex::default());

    harness
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();

    let file = harness
        .index
        .document("arcp://name,root/arcp://name,obj/doc.txt");
    assert_eq!(file["license"][0]["@id"], "#closed");
    assert!(file.get("_text").is_none());
    assert!(file.get("_error").is_none());
    assert!(harness.repository.file_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_file_content_is_marked() {
    let repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,root"])
        .list(Some("arcp://name,root"), OBJECT, &["arcp://name,obj"])
        .with_crate("arcp://name,root", collection("Root", None))
        .with_crate(
            "arcp://name,obj",
            object("Obj", "arcp://name,root", None),
        );
    let harness = Harness::new(repository, MemoryIndex::default());

    harness
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();

    let file = harness
        .index
        .document("arcp://name,root/arcp://name,obj/doc.txt");
    assert_eq!(file["_error"], "file_not_found");
    assert!(file.get("_text").is_none());
}

#[tokio::test]
async fn test_in_memory_members_are_indexed_without_fetching() {
    let doc = crate_doc(
        json!({
            "@id": "./",
            "@type": ["Dataset", "RepositoryCollection"],
            "name": "Corpus",
            "conformsTo": {"@id": COLLECTION},
            "hasMember": [{"@id": "#item-1"}, {"@id": "#untyped"}]
        }),
        vec![
            json!({
                "@id": "#item-1",
                "@type": ["RepositoryObject"],
                "name": "Item one",
                "conformsTo": {"@id": OBJECT},
                "hasPart": [{"@id": "item-1.wav"}]
            }),
            json!({
                "@id": "#untyped",
                "@type": ["Dataset"],
                "name": "Untyped",
                "conformsTo": {"@id": OBJECT}
            }),
            json!({"@id": "item-1.wav", "@type": "File", "encodingFormat": "audio/wav"}),
        ],
    );
    let repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,corpus"])
        .with_crate("arcp://name,corpus", doc);
    let harness = Harness::new(repository, MemoryIndex::default());

    harness
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();

    let documents = harness.index.snapshot();
    assert_eq!(documents.len(), 3);

    let item = harness
        .index
        .document("arcp://name,corpus/arcp://name,corpus/#item-1");
    assert_eq!(item["_isOCFL"], "false");
    assert_eq!(ids(&item["_memberOf"]), vec!["arcp://name,corpus"]);
    assert_eq!(ids(&item["_collectionStack"]), vec!["arcp://name,corpus"]);

    let wav = harness
        .index
        .document("arcp://name,corpus/arcp://name,corpus/item-1.wav");
    assert_eq!(wav["_parent"]["@id"], "#item-1");
    assert!(wav.get("_text").is_none());
}

#[tokio::test]
async fn test_collection_listing_itself_as_member_is_indexed_once() {
    let doc = crate_doc(
        json!({
            "@id": "./",
            "@type": ["Dataset", "RepositoryCollection"],
            "name": "Corpus",
            "conformsTo": {"@id": COLLECTION},
            "hasMember": [{"@id": "./"}, {"@id": "#item"}]
        }),
        vec![json!({
            "@id": "#item",
            "@type": ["RepositoryObject"],
            "name": "Item",
            "conformsTo": {"@id": OBJECT}
        })],
    );
    let repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,corpus"])
        .with_crate("arcp://name,corpus", doc);
    let harness = Harness::new(repository, MemoryIndex::default());

    let stats = harness
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();

    assert_eq!(
        harness.index.snapshot().keys().cloned().collect::<Vec<_>>(),
        vec![
            "arcp://name,corpus/arcp://name,corpus/#item".to_string(),
            "arcp://name,corpus/arcp://name,corpus/arcp://name,corpus".to_string(),
        ]
    );
    assert_eq!(stats.collections, 1);
    assert_eq!(stats.objects, 1);
}

#[tokio::test]
async fn test_in_memory_members_inherit_collection_license() {
    let doc = crate_doc(
        json!({
            "@id": "./",
            "@type": ["Dataset", "RepositoryCollection"],
            "name": "Corpus",
            "conformsTo": {"@id": COLLECTION},
            "license": {"@id": "#corpus-licence"},
            "hasMember": [{"@id": "#open-sub"}, {"@id": "#closed-sub"}]
        }),
        vec![
            json!({"@id": "#corpus-licence", "@type": "CreativeWork", "name": "Corpus"}),
            json!({"@id": "#closed-licence", "@type": "CreativeWork", "name": "Closed"}),
            json!({
                "@id": "#open-sub",
                "@type": ["RepositoryCollection"],
                "conformsTo": {"@id": COLLECTION},
                "hasMember": [{"@id": "#open-item"}]
            }),
            json!({
                "@id": "#open-item",
                "@type": ["RepositoryObject"],
                "conformsTo": {"@id": OBJECT},
                "hasPart": [{"@id": "open.txt"}]
            }),
            json!({"@id": "open.txt", "@type": "File", "encodingFormat": "text/plain"}),
            json!({
                "@id": "#closed-sub",
                "@type": ["RepositoryCollection"],
                "conformsTo": {"@id": COLLECTION},
                "license": {"@id": "#closed-licence"},
                "hasMember": [{"@id": "#closed-item"}]
            }),
            json!({
                "@id": "#closed-item",
                "@type": ["RepositoryObject"],
                "conformsTo": {"@id": OBJECT}
            }),
        ],
    );
    let repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,corpus"])
        .with_crate("arcp://name,corpus", doc);
    let harness = Harness::new(repository, MemoryIndex::default());

    // no default license configured
    harness.indexer(&Config::default()).run().await.unwrap();

    assert_eq!(harness.index.snapshot().len(), 6);
    let license_of = |item: &str| {
        let document = harness
            .index
            .document(&format!("arcp://name,corpus/arcp://name,corpus/{item}"));
        document["license"][0]["@id"].clone()
    };
    assert_eq!(license_of("#open-sub"), "#corpus-licence");
    assert_eq!(license_of("#open-item"), "#corpus-licence");
    assert_eq!(license_of("open.txt"), "#corpus-licence");
    assert_eq!(license_of("#closed-sub"), "#closed-licence");
    assert_eq!(license_of("#closed-item"), "#closed-licence");
}

#[tokio::test]
async fn test_write_failure_is_isolated() {
    let harness = Harness::new(two_level_repository(), MemoryIndex::rejecting(&[SUB_DOC]));

    let stats = harness
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();

    let documents = harness.index.snapshot();
    assert_eq!(documents.len(), 3);
    assert!(!documents.contains_key(SUB_DOC));
    assert_eq!(stats.write_failures, 1);
    assert_eq!(
        harness.sink.stages(),
        vec![("arcp://name,sub".to_string(), DiagnosticStage::Root)]
    );
}

#[tokio::test]
async fn test_fetch_failure_policy() {
    let repository = || {
        MemoryRepository::default()
            .list(
                None,
                COLLECTION,
                &["arcp://name,missing", "arcp://name,root"],
            )
            .with_crate("arcp://name,root", collection("Root", None))
    };

    let skipping = Harness::new(repository(), MemoryIndex::default());
    let stats = skipping
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();
    assert_eq!(stats.fetch_failures, 1);
    assert!(skipping.index.snapshot().contains_key(ROOT_DOC));
    assert_eq!(
        skipping.sink.stages(),
        vec![("arcp://name,missing".to_string(), DiagnosticStage::Fetch)]
    );

    let mut config = config_with_default_license();
    config.crawl.on_fetch_error = FetchErrorPolicy::Abort;
    let aborting = Harness::new(repository(), MemoryIndex::default());
    assert!(aborting.indexer(&config).run().await.is_err());
    assert!(aborting.index.snapshot().is_empty());
}

#[tokio::test]
async fn test_stop_limits_top_level_only() {
    let repository = two_level_repository()
        .list(
            None,
            COLLECTION,
            &["arcp://name,root", "arcp://name,other"],
        )
        .with_crate("arcp://name,other", collection("Other", None));
    let harness = Harness::new(repository, MemoryIndex::default());

    let stats = harness
        .indexer(&config_with_default_license())
        .with_stop(Some(1))
        .run()
        .await
        .unwrap();

    assert_eq!(stats.written(), 4);
    assert!(
        harness
            .index
            .snapshot()
            .keys()
            .all(|id| !id.contains("arcp://name,other"))
    );
}

#[tokio::test]
async fn test_skip_patterns_exclude_crates() {
    let harness = Harness::new(two_level_repository(), MemoryIndex::default());
    let config = config_with_default_license();
    let writer = IndexWriter::new(harness.index.clone(), harness.sink.clone());
    let skip = crate_indexer::utils::skip_regex(&["NAME,SUB".to_string()]).unwrap();
    let mut indexer = Indexer::new(
        &config,
        harness.repository.clone(),
        writer,
        Vocabulary::load(&config.vocabulary).unwrap(),
        skip,
    )
    .unwrap();

    let stats = indexer.run().await.unwrap();

    assert_eq!(
        harness.index.snapshot().keys().cloned().collect::<Vec<_>>(),
        vec![ROOT_DOC]
    );
    assert_eq!(stats.skipped, 1);
}

#[tokio::test]
async fn test_listed_crate_declaring_another_profile_is_not_fetched() {
    let mut repository = MemoryRepository::default()
        .list(None, COLLECTION, &["arcp://name,root", "arcp://name,stray"])
        .with_crate("arcp://name,root", collection("Root", None));
    repository
        .listings
        .get_mut(&listing_key(None, COLLECTION))
        .unwrap()[1]
        .conforms_to = vec![OBJECT.to_string()];
    let harness = Harness::new(repository, MemoryIndex::default());

    let stats = harness
        .indexer(&config_with_default_license())
        .run()
        .await
        .unwrap();

    assert_eq!(
        harness.index.snapshot().keys().cloned().collect::<Vec<_>>(),
        vec![ROOT_DOC]
    );
    assert!(harness.sink.stages().is_empty());
    assert_eq!(stats.fetch_failures, 0);
    assert_eq!(stats.skipped, 1);
}
