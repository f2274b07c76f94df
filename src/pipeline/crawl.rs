// src/pipeline/crawl.rs

//! Crawl orchestration.
//!
//! Walks the membership hierarchy depth-first: every listed crate is fetched,
//! normalized and classified; collections are written and then recursed
//! into, objects are written together with their files. Each remote call is
//! awaited before the next one starts, and a parent's document is always
//! written before its children are fetched.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use serde_json::{Map, Value, json};

use crate::error::{AppError, Result};
use crate::graph::{Entity, Graph, Vocabulary, flatten, literal_str};
use crate::models::{
    CollectionStack, Config, ConformsToConfig, CrawlStats, FetchErrorPolicy, ItemKind, License,
    Pointer,
};
use crate::services::{HttpRepository, LicenseResolver, OpenSearchIndex, Repository, locate};
use crate::storage::{DiagnosticStage, LocalDiagnostics};
use crate::utils::http::create_client;
use crate::utils::{load_skip_list, skip_regex};

use super::bootstrap::ensure_index;
use super::writer::{IndexWriter, document_id};

const HAS_MEMBER: [&str; 2] = ["pcdm:hasMember", "hasMember"];
const MEMBER_OF: [&str; 2] = ["pcdm:memberOf", "memberOf"];
const TEXT_LINKS: [&str; 2] = ["indexableText", "mainText"];

const REPOSITORY_COLLECTION: &str = "RepositoryCollection";
const REPOSITORY_OBJECT: &str = "RepositoryObject";

/// Where an item sits while it is being indexed.
#[derive(Clone, Copy)]
struct Frame<'a> {
    graph: &'a Graph,
    crate_id: &'a str,
    root: &'a Pointer,
    /// `_memberOf` value for items in this frame
    member_of: &'a Value,
    stack: &'a CollectionStack,
    /// Whether the item was fetched as a repository object
    is_ocfl: bool,
    /// Resolved license of the enclosing collection in the same crate
    inherited: Option<&'a License>,
}

impl<'a> Frame<'a> {
    /// Id an entity is indexed under; a crate's root dataset goes by the crate id.
    fn item_id(&self, entity: &'a Entity) -> &'a str {
        if entity.id == self.graph.root_id() {
            self.crate_id
        } else {
            &entity.id
        }
    }

    /// Pointer to an entity of this frame.
    fn pointer(&self, entity: &'a Entity) -> Pointer {
        Pointer {
            id: self.item_id(entity).to_string(),
            ..Pointer::to_entity(entity)
        }
    }
}

/// Recursive crawler writing one document per collection, object and file.
pub struct Indexer {
    repository: Arc<dyn Repository>,
    writer: IndexWriter,
    licenses: LicenseResolver,
    vocabulary: Vocabulary,
    profiles: ConformsToConfig,
    skip: Option<Regex>,
    text_formats: Vec<Regex>,
    on_fetch_error: FetchErrorPolicy,
    stop: Option<usize>,
    top_level_seen: usize,
    stats: CrawlStats,
}

impl Indexer {
    pub fn new(
        config: &Config,
        repository: Arc<dyn Repository>,
        writer: IndexWriter,
        vocabulary: Vocabulary,
        skip: Option<Regex>,
    ) -> Result<Self> {
        let text_formats = config
            .crawl
            .text_formats
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            repository,
            writer,
            licenses: LicenseResolver::new(&config.license),
            vocabulary,
            profiles: config.conforms_to.clone(),
            skip,
            text_formats,
            on_fetch_error: config.crawl.on_fetch_error,
            stop: None,
            top_level_seen: 0,
            stats: CrawlStats::start(),
        })
    }

    /// Stop after `stop` top-level crates; descendants are still crawled.
    pub fn with_stop(mut self, stop: Option<usize>) -> Self {
        self.stop = stop;
        self
    }

    /// Crawl from the top-level collections down.
    pub async fn run(&mut self) -> Result<CrawlStats> {
        self.stats = CrawlStats::start();
        self.top_level_seen = 0;

        let profile = self.profiles.collection.clone();
        let result = self
            .traverse(None, &profile, None, &CollectionStack::new())
            .await;

        self.stats.finish();
        result.map(|()| self.stats.clone())
    }

    /// Index every crate listed as a member of `member_of` (top-level when
    /// `None`) that conforms to `conforms_to`.
    ///
    /// `root` is the collection heading this traversal; top-level crates
    /// head their own.
    pub fn traverse<'a>(
        &'a mut self,
        member_of: Option<&'a Pointer>,
        conforms_to: &'a str,
        root: Option<&'a Pointer>,
        stack: &'a CollectionStack,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let parent_id = member_of.map(|p| p.id.as_str());
            log::info!(
                "Finding objects that are membersOf {} and conformsTo {}",
                parent_id.unwrap_or("(top level)"),
                conforms_to
            );

            let refs = match self.repository.list_objects(parent_id, conforms_to).await {
                Ok(refs) => refs,
                Err(e) => {
                    let payload = json!({
                        "memberOf": parent_id,
                        "conformsTo": conforms_to,
                        "error": e.to_string(),
                    });
                    return self
                        .fetch_failed(parent_id.unwrap_or("top-level"), payload, e)
                        .await;
                }
            };

            let member_of_value = match member_of {
                Some(parent) => json!([parent.untyped().to_value()]),
                None => json!([]),
            };

            for crate_ref in refs {
                if member_of.is_none() {
                    if self.stop.is_some_and(|stop| self.top_level_seen >= stop) {
                        log::info!("Stopping after {} top-level crate(s)", self.top_level_seen);
                        break;
                    }
                    self.top_level_seen += 1;
                }

                if !crate_ref.declares(conforms_to) {
                    log::warn!(
                        "{} listed under {} but declares {:?}, skipping",
                        crate_ref.id,
                        conforms_to,
                        crate_ref.conforms_to
                    );
                    self.stats.skipped += 1;
                    continue;
                }

                if self.skip.as_ref().is_some_and(|re| re.is_match(&crate_ref.id)) {
                    log::info!("Skipping: {}", crate_ref.id);
                    self.stats.skipped += 1;
                    continue;
                }

                let graph = match self.fetch_graph(&crate_ref.id).await {
                    Ok(graph) => graph,
                    Err(e) => {
                        let payload = json!({ "crateId": crate_ref.id, "error": e.to_string() });
                        self.fetch_failed(&crate_ref.id, payload, e).await?;
                        continue;
                    }
                };

                let own_root;
                let root = match root {
                    Some(root) => root,
                    None => {
                        own_root = crate_ref.to_pointer();
                        &own_root
                    }
                };
                let frame = Frame {
                    graph: &graph,
                    crate_id: &crate_ref.id,
                    root,
                    member_of: &member_of_value,
                    stack,
                    is_ocfl: true,
                    inherited: None,
                };

                let item = graph.root();
                match self.classify(item, false) {
                    Some(ItemKind::Collection) => self.index_collection(item, &frame).await?,
                    Some(ItemKind::Object) => self.index_object(item, &frame).await,
                    _ => {
                        log::info!("{} is not a collection or object, not indexing", crate_ref.id);
                        self.stats.skipped += 1;
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// Write a collection, then recurse into its members: in memory when the
    /// graph lists them, through the repository otherwise.
    fn index_collection<'a>(
        &'a mut self,
        item: &'a Entity,
        frame: &'a Frame<'a>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            log::debug!("Indexing collection {}", item.id);

            let license = self.licenses.resolve_content_license(
                frame.graph,
                &[item.first("license")],
                frame.inherited,
            );
            let entity = item.without(&["hasPart", MEMBER_OF[0], MEMBER_OF[1]]);
            if let Some(mut document) =
                self.document(ItemKind::Collection, &entity, license.clone(), frame)
            {
                if item.first_of(&MEMBER_OF).is_none() {
                    document.insert("_isTopLevel".into(), Value::String("true".into()));
                }
                if let Some(geo) = locate(frame.graph, item) {
                    geo.apply(&mut document);
                }
                self.write(ItemKind::Collection, frame.item_id(item), frame, document)
                    .await;
            }

            let collection = frame.pointer(item).untyped();
            let stack = frame.stack.extended(collection.clone());
            let member_of = json!([collection.to_value()]);

            let member_ids: Vec<&str> = HAS_MEMBER
                .iter()
                .flat_map(|property| item.references(property))
                .collect();

            if member_ids.is_empty() {
                let collections = self.profiles.collection.clone();
                let objects = self.profiles.object.clone();
                self.traverse(Some(&collection), &collections, Some(frame.root), &stack)
                    .await?;
                self.traverse(Some(&collection), &objects, Some(frame.root), &stack)
                    .await?;
                return Ok(());
            }

            let child = Frame {
                member_of: &member_of,
                stack: &stack,
                is_ocfl: false,
                inherited: license.as_ref().or(frame.inherited),
                ..*frame
            };
            for id in member_ids {
                let Some(member) = frame.graph.entity(id) else {
                    log::warn!("Member {} of {} is not in the crate", id, item.id);
                    continue;
                };
                let member_id = frame.item_id(member);
                if member.id == item.id || stack.entries().iter().any(|p| p.id == member_id) {
                    log::warn!("Member {} of {} is its own ancestor", id, item.id);
                    continue;
                }
                match self.classify(member, true) {
                    Some(ItemKind::Collection) => self.index_collection(member, &child).await?,
                    Some(ItemKind::Object) => self.index_object(member, &child).await,
                    _ => {
                        log::info!("{} is not a collection or object, not indexing", member.id);
                        self.stats.skipped += 1;
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// Write an object and each of its `hasPart` files.
    async fn index_object(&mut self, item: &Entity, frame: &Frame<'_>) {
        log::debug!("Indexing object {}", item.id);

        // in-memory members inherit from their collection before the root dataset
        let root_license = match frame.inherited {
            Some(_) => None,
            None => frame.graph.root().first("license"),
        };
        let license = self.licenses.resolve_content_license(
            frame.graph,
            &[item.first("license"), root_license],
            frame.inherited,
        );
        let entity = item.without(&MEMBER_OF);
        let Some(mut document) = self.document(ItemKind::Object, &entity, license.clone(), frame)
        else {
            return;
        };
        if let Some(geo) = locate(frame.graph, item) {
            geo.apply(&mut document);
        }
        self.write(ItemKind::Object, frame.item_id(item), frame, document)
            .await;

        for file_id in item.references("hasPart") {
            self.index_file(item, file_id, license.as_ref(), frame).await;
        }
    }

    /// Write one file, inlining its text when allowed. Without a license of
    /// its own the file takes the license its object resolved to.
    async fn index_file(
        &mut self,
        parent: &Entity,
        file_id: &str,
        parent_license: Option<&License>,
        frame: &Frame<'_>,
    ) {
        let Some(file) = frame.graph.entity(file_id) else {
            log::warn!("No file entity for {} in {}", file_id, frame.crate_id);
            return;
        };
        log::debug!("Indexing file {}", file.id);

        let license = self.licenses.resolve_content_license(
            frame.graph,
            &[file.first("license")],
            parent_license,
        );
        let text_allowed = license.as_ref().is_some_and(License::permits_text_index);

        let file_frame = Frame {
            is_ocfl: false,
            ..*frame
        };
        let Some(mut document) = self.document(ItemKind::File, file, license, &file_frame) else {
            return;
        };
        document.insert("_parent".into(), frame.pointer(parent).to_value());

        if text_allowed && self.is_indexable_text(frame.graph, file) {
            match self.repository.fetch_file(frame.crate_id, &file.id).await {
                Ok(Some(text)) => {
                    log::info!("Indexing content: {}", file.id);
                    document.insert("_text".into(), Value::String(text));
                }
                Ok(None) => {
                    log::warn!("File {} of {} not found", file.id, frame.crate_id);
                    document.insert("_error".into(), Value::String("file_not_found".into()));
                }
                Err(e) => {
                    log::warn!("Failed to fetch {} of {}: {}", file.id, frame.crate_id, e);
                    document.insert("_error".into(), Value::String("file_not_found".into()));
                }
            }
        }

        self.write(ItemKind::File, &file.id, frame, document).await;
    }

    /// Flattened document with the hierarchy and license fields, or `None`
    /// when the item has no content or metadata license.
    fn document(
        &mut self,
        kind: ItemKind,
        entity: &Entity,
        license: Option<License>,
        frame: &Frame<'_>,
    ) -> Option<Map<String, Value>> {
        let Some(license) = license else {
            log::warn!(
                "Skipping {} {} of {}, no license found",
                kind.as_str(),
                entity.id,
                frame.crate_id
            );
            self.stats.skipped += 1;
            return None;
        };
        let Some(metadata) = self.licenses.resolve_metadata_license(frame.graph) else {
            self.stats.skipped += 1;
            return None;
        };

        let root_id = frame.root.id.as_str();
        let mut document = flatten(frame.graph, entity, 1);
        document.insert("license".into(), json!([license]));
        document.insert("_crateId".into(), Value::String(frame.crate_id.to_string()));
        document.insert("_root".into(), json!([frame.root.to_value()]));
        document.insert("_memberOf".into(), frame.member_of.clone());
        document.insert("_collectionStack".into(), frame.stack.to_value());
        document.insert("_subCollection".into(), frame.stack.sub_collections(root_id));
        document.insert("_mainCollection".into(), frame.stack.main_collections(root_id));
        document.insert("_metadataIsPublic".into(), Value::Bool(metadata.is_public));
        document.insert("_metadataLicense".into(), json!(metadata));
        document.insert("_isOCFL".into(), Value::String(frame.is_ocfl.to_string()));
        Some(document)
    }

    async fn write(
        &mut self,
        kind: ItemKind,
        item_id: &str,
        frame: &Frame<'_>,
        document: Map<String, Value>,
    ) {
        let id = document_id(&frame.root.id, frame.crate_id, item_id);
        let outcome = self
            .writer
            .upsert(&id, frame.crate_id, kind, &Value::Object(document))
            .await;
        if outcome.is_written() {
            self.stats.record_written(kind);
        } else {
            self.stats.write_failures += 1;
        }
    }

    /// Conformance role of a crate root or an in-memory member. Members
    /// must also carry the matching repository type.
    fn classify(&self, entity: &Entity, in_memory: bool) -> Option<ItemKind> {
        let typed = |ty: &str| !in_memory || entity.has_type(ty);
        if entity.conforms_to(&self.profiles.collection) && typed(REPOSITORY_COLLECTION) {
            Some(ItemKind::Collection)
        } else if entity.conforms_to(&self.profiles.object) && typed(REPOSITORY_OBJECT) {
            Some(ItemKind::Object)
        } else {
            None
        }
    }

    /// Linked as `indexableText`/`mainText` and of a textual format.
    fn is_indexable_text(&self, graph: &Graph, file: &Entity) -> bool {
        let linked = TEXT_LINKS.iter().any(|link| {
            !graph.reverse_links(&file.id, link).is_empty()
                || !graph
                    .reverse_links(&file.id, &self.vocabulary.prefixed(link))
                    .is_empty()
        });
        linked
            && file
                .get("encodingFormat")
                .iter()
                .filter_map(literal_str)
                .any(|format| self.text_formats.iter().any(|re| re.is_match(format)))
    }

    async fn fetch_graph(&self, id: &str) -> Result<Graph> {
        let document = self.repository.fetch_crate(id).await?;
        let graph = Graph::from_json(&document)?;
        self.vocabulary.normalize(&graph)
    }

    /// Apply the fetch-error policy to a failed listing or graph fetch.
    async fn fetch_failed(&mut self, crate_id: &str, payload: Value, error: AppError) -> Result<()> {
        self.stats.fetch_failures += 1;
        if self.on_fetch_error == FetchErrorPolicy::Abort {
            return Err(error);
        }
        log::error!("Fetch failed for {}: {}", crate_id, error);
        self.writer
            .divert(crate_id, DiagnosticStage::Fetch, &payload)
            .await;
        Ok(())
    }
}

/// Run a full crawl against the configured repository and search index.
pub async fn run_indexer(config: &Config, stop: Option<usize>) -> Result<CrawlStats> {
    let patterns = match &config.crawl.skip_file {
        Some(path) if path.exists() => load_skip_list(path)?,
        Some(path) => {
            log::warn!("Skip list {} not found, indexing everything", path.display());
            Vec::new()
        }
        None => Vec::new(),
    };
    let skip = skip_regex(&patterns)?;
    let vocabulary = Vocabulary::load(&config.vocabulary)?;

    let client = create_client(&config.api)?;
    let repository = Arc::new(HttpRepository::with_client(client.clone(), &config.api));
    let index = Arc::new(OpenSearchIndex::new(client, &config.search));
    ensure_index(index.as_ref(), &config.search).await?;

    let diagnostics = Arc::new(LocalDiagnostics::new(&config.logging.log_folder));
    let writer = IndexWriter::new(index, diagnostics);

    if let Some(stop) = stop {
        log::info!("Indexer will stop at {} top-level crate(s)", stop);
    }
    let mut indexer = Indexer::new(config, repository, writer, vocabulary, skip)?.with_stop(stop);
    let stats = indexer.run().await?;

    let elapsed = stats
        .end_time
        .map(|end| (end - stats.start_time).num_seconds())
        .unwrap_or_default();
    log::info!(
        "Indexed {} collection(s), {} object(s), {} file(s) in {}s",
        stats.collections,
        stats.objects,
        stats.files,
        elapsed
    );
    if stats.skipped > 0 || stats.write_failures > 0 || stats.fetch_failures > 0 {
        log::warn!(
            "{} skipped, {} write failure(s), {} fetch failure(s); see {}",
            stats.skipped,
            stats.write_failures,
            stats.fetch_failures,
            config.logging.log_folder.display()
        );
    }

    Ok(stats)
}
