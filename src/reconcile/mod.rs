//! Merges the assets of a release into a previously written manifest.
//!
//! The previous manifest is only ever read: ids are resolved against it by
//! [`IdResolver`], refreshed items are collected in a separate map, and the
//! untouched previous items are layered underneath at the end.

mod identity;
mod policy;

pub use policy::MetadataPolicy;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::github::ReleaseAsset;
use crate::helpers::{AssetFetcher, FetchError, sha256_hex};
use crate::manifest::{Item, Manifest};
use identity::IdResolver;

/// ISO-8601 UTC with microseconds and a literal `Z`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub manifest: Manifest,
    pub added: usize,
    pub updated: usize,
    /// New dictionaries that had no curated metadata entry.
    pub unlisted: Vec<String>,
}

/// Reconcile `assets` of `release_tag` into `base`.
///
/// Assets whose filename does not carry the policy's extension are ignored.
/// Every matching asset is downloaded once; a failed download aborts the
/// whole pass.
pub async fn reconcile<F>(
    base: &Manifest,
    release_tag: &str,
    assets: &[ReleaseAsset],
    policy: MetadataPolicy<'_>,
    fetcher: &F,
    now: DateTime<Utc>,
) -> Result<Reconciled, FetchError>
where
    F: AssetFetcher + ?Sized,
{
    let kind = policy.kind();
    let stamp = timestamp(now);
    let mut resolver = IdResolver::new(kind.extension(), base.items());
    let mut refreshed: BTreeMap<String, Item> = BTreeMap::new();
    let (mut added, mut updated) = (0, 0);
    let mut unlisted = Vec::new();

    for asset in assets.iter().filter(|a| kind.matches(a.filename())) {
        let filename = asset.filename();
        let id = resolver.resolve(filename);
        let previous = resolver.previous(&id);
        let is_new = previous.is_none();

        if is_new {
            info!("{kind}: adding new '{id}' from release {release_tag}");
            added += 1;
        } else {
            info!("{kind}: updating existing '{id}' from release {release_tag}");
            updated += 1;
        }

        debug!("{kind}: computing sha256 for {filename}");
        let body = fetcher.fetch(asset.url()).await?;

        let mut item = previous
            .cloned()
            .unwrap_or_else(|| Item::new(id.as_str(), filename));
        item.set_url(asset.url());
        item.set_bytes(asset.size());
        item.set_sha256(sha256_hex(&body));
        item.set_updated_at(&stamp);
        if item.filename() != Some(filename) {
            item.set_filename(filename);
        }

        if policy.apply(&mut item, &body, is_new) {
            unlisted.push(id.clone());
        }
        refreshed.insert(id, item);
    }

    let mut items: BTreeMap<String, Item> = base
        .items()
        .iter()
        .map(|item| (item.id().to_string(), item.clone()))
        .collect();
    items.extend(refreshed);

    let manifest = Manifest::new(stamp, release_tag.to_string(), items.into_values().collect());
    Ok(Reconciled {
        manifest,
        added,
        updated,
        unlisted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{DictMetadata, UiField};
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryFetcher {
        bodies: HashMap<String, Vec<u8>>,
    }

    impl MemoryFetcher {
        fn with(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), body.to_vec());
            self
        }
    }

    #[async_trait::async_trait]
    impl AssetFetcher for MemoryFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    fn url(filename: &str) -> String {
        format!("https://github.com/octo/assets/releases/download/v1.0/{filename}")
    }

    fn asset(filename: &str, body: &[u8]) -> ReleaseAsset {
        ReleaseAsset::new(filename, url(filename), body.len() as u64)
    }

    fn fetcher_for(files: &[(&str, &[u8])]) -> MemoryFetcher {
        files
            .iter()
            .fold(MemoryFetcher::default(), |f, (name, body)| f.with(&url(name), body))
    }

    fn assets_for(files: &[(&str, &[u8])]) -> Vec<ReleaseAsset> {
        files.iter().map(|(name, body)| asset(name, body)).collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn later() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn without_timestamps(manifest: &Manifest) -> Vec<Item> {
        manifest
            .items()
            .iter()
            .cloned()
            .map(|mut item| {
                item.set_updated_at("");
                item
            })
            .collect()
    }

    fn ids(manifest: &Manifest) -> Vec<&str> {
        manifest.items().iter().map(Item::id).collect()
    }

    async fn run_dicts(
        base: &Manifest,
        files: &[(&str, &[u8])],
        metadata: &DictMetadata,
        at: DateTime<Utc>,
    ) -> Manifest {
        reconcile(
            base,
            "v1.0",
            &assets_for(files),
            MetadataPolicy::Dictionary(metadata),
            &fetcher_for(files),
            at,
        )
        .await
        .unwrap()
        .manifest
    }

    #[test]
    fn timestamp_has_trailing_z() {
        assert_eq!(timestamp(now()), "2024-05-01T12:30:00.000000Z");
    }

    #[tokio::test]
    async fn new_dictionary_from_empty_manifest() {
        let body: &[u8] = b"0123456789";
        let files = [("foo.dict", body)];

        let out = run_dicts(&Manifest::default(), &files, &DictMetadata::default(), now()).await;

        assert_eq!(out.release_tag(), "v1.0");
        assert_eq!(out.generated_at(), "2024-05-01T12:30:00.000000Z");
        assert_eq!(out.items().len(), 1);

        let item = &out.items()[0];
        assert_eq!(item.id(), "foo");
        assert_eq!(item.filename(), Some("foo.dict"));
        assert_eq!(item.url(), url("foo.dict"));
        assert_eq!(item.bytes(), 10);
        assert_eq!(item.sha256(), sha256_hex(body));
        assert_eq!(item.sha256().len(), 64);
        assert_eq!(item.updated_at(), "2024-05-01T12:30:00.000000Z");
        assert_eq!(item.name(), Some("Foo"));
        assert_eq!(item.short_description(), Some(""));
        assert_eq!(item.language_tag(), Some(""));
    }

    #[tokio::test]
    async fn rerun_is_idempotent_apart_from_timestamps() {
        let files: [(&str, &[u8]); 3] = [
            ("foo_v1.dict", b"one"),
            ("foo-v2.dict", b"two"),
            ("de_base.dict", b"three"),
        ];
        let metadata = DictMetadata::default();

        let first = run_dicts(&Manifest::default(), &files, &metadata, now()).await;
        let second = run_dicts(&first, &files, &metadata, later()).await;
        let again = run_dicts(&first, &files, &metadata, later()).await;

        assert_eq!(without_timestamps(&first), without_timestamps(&second));
        assert_eq!(second.items(), again.items());
        assert_eq!(ids(&second), ["de_base", "foo", "foo_1"]);
    }

    #[tokio::test]
    async fn renamed_asset_keeps_its_id() {
        let mut existing = Item::new("x", "a.dict");
        existing.set_ui(UiField::Name, "Curated");
        let base = Manifest::new(String::new(), "v0.9".into(), vec![existing]);

        let files: [(&str, &[u8]); 1] = [("x_v2.dict", b"new body")];
        let out = run_dicts(&base, &files, &DictMetadata::default(), now()).await;

        assert_eq!(ids(&out), ["x"]);
        let item = &out.items()[0];
        assert_eq!(item.filename(), Some("x_v2.dict"));
        assert_eq!(item.name(), Some("Curated"));
        assert_eq!(item.sha256(), sha256_hex(b"new body"));
    }

    #[tokio::test]
    async fn legacy_id_is_kept_through_filename() {
        let base = Manifest::new(
            String::new(),
            "v0.9".into(),
            vec![Item::new("legacy_name", "old.dict")],
        );

        let files: [(&str, &[u8]); 1] = [("old.dict", b"body")];
        let out = run_dicts(&base, &files, &DictMetadata::default(), now()).await;

        assert_eq!(ids(&out), ["legacy_name"]);
        assert_eq!(out.items()[0].name(), Some("Legacy Name"));
    }

    #[tokio::test]
    async fn colliding_new_ids_are_suffixed_in_input_order() {
        let files: [(&str, &[u8]); 2] = [("foo_v1.dict", b"a"), ("foo-v2.dict", b"b")];
        let out = run_dicts(&Manifest::default(), &files, &DictMetadata::default(), now()).await;

        assert_eq!(ids(&out), ["foo", "foo_1"]);
        assert_eq!(out.item("foo").unwrap().filename(), Some("foo_v1.dict"));
        assert_eq!(out.item("foo_1").unwrap().filename(), Some("foo-v2.dict"));
    }

    #[tokio::test]
    async fn items_missing_from_release_are_retained_verbatim() {
        let retained = r#"{
      "id": "zz_old",
      "name": "Old",
      "filename": "zz_old.dict",
      "bytes": null,
      "reviewer": "kept",
      "alpha": [
        1,
        2
      ]
    }"#;
        let base = crate::manifest::parse_manifest(&format!(
            "{{\"releaseTag\": \"v0.1\", \"items\": [{retained}]}}"
        ))
        .unwrap();

        let files: [(&str, &[u8]); 1] = [("foo.dict", b"x")];
        let out = run_dicts(&base, &files, &DictMetadata::default(), now()).await;

        assert_eq!(ids(&out), ["foo", "zz_old"]);
        let written = crate::manifest::render_manifest(&out).unwrap();
        assert!(written.contains(retained), "retained item was rewritten:\n{written}");
    }

    #[tokio::test]
    async fn missing_metadata_is_reported_for_new_dictionaries_only() {
        let files: [(&str, &[u8]); 1] = [("foo.dict", b"x")];
        let assets = assets_for(&files);
        let fetcher = fetcher_for(&files);
        let metadata = DictMetadata::default();
        let policy = MetadataPolicy::Dictionary(&metadata);

        let first = reconcile(&Manifest::default(), "v1.0", &assets, policy, &fetcher, now())
            .await
            .unwrap();
        assert_eq!(first.unlisted, ["foo"]);

        let second = reconcile(&first.manifest, "v1.0", &assets, policy, &fetcher, later())
            .await
            .unwrap();
        assert!(second.unlisted.is_empty());
        assert_eq!(second.updated, 1);
    }

    #[tokio::test]
    async fn output_is_sorted_by_id() {
        let files: [(&str, &[u8]); 4] = [
            ("zulu.dict", b"z"),
            ("alpha.dict", b"a"),
            ("mike.dict", b"m"),
            ("bravo.dict", b"b"),
        ];
        let out = run_dicts(&Manifest::default(), &files, &DictMetadata::default(), now()).await;

        assert_eq!(ids(&out), ["alpha", "bravo", "mike", "zulu"]);
    }

    #[tokio::test]
    async fn metadata_entries_override_and_curated_names_survive() {
        let metadata = DictMetadata::from_json_str(
            r#"{"de_base": {"name": "German", "shortDescription": "", "languageTag": "de"}}"#,
        )
        .unwrap();

        let mut de = Item::new("de_base", "de_base.dict");
        de.set_ui(UiField::Name, "De Base");
        let mut fr = Item::new("fr_base", "fr_base.dict");
        fr.set_ui(UiField::Name, "Français (curated)");
        let base = Manifest::new(String::new(), "v0.9".into(), vec![de, fr]);

        let files: [(&str, &[u8]); 2] = [("de_base.dict", b"de"), ("fr_base.dict", b"fr")];
        let first = run_dicts(&base, &files, &metadata, now()).await;
        let second = run_dicts(&first, &files, &metadata, later()).await;

        for out in [&first, &second] {
            assert_eq!(out.item("de_base").unwrap().name(), Some("German"));
            assert_eq!(out.item("de_base").unwrap().language_tag(), Some("de"));
            assert_eq!(out.item("fr_base").unwrap().name(), Some("Français (curated)"));
        }
    }

    #[tokio::test]
    async fn layouts_take_ui_fields_from_their_body() {
        let body: &[u8] = br#"{"name": "Neo 2", "description": "German ergonomic layout\nwith layers"}"#;
        let files = [("neo_2.json", body), ("broken.json", b"{" as &[u8])];

        let mut previous = Item::new("neo_2", "neo_2.json");
        previous.set_ui(UiField::LanguageTag, "de");
        let base = Manifest::new(String::new(), "v0.9".into(), vec![previous]);

        let out = reconcile(
            &base,
            "layouts-7",
            &assets_for(&files),
            MetadataPolicy::Layout,
            &fetcher_for(&files),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(out.added, 1);
        assert_eq!(out.updated, 1);

        let neo = out.manifest.item("neo_2").unwrap();
        assert_eq!(neo.name(), Some("Neo 2"));
        assert_eq!(neo.short_description(), Some("German ergonomic layout"));
        assert_eq!(neo.language_tag(), Some("de"));

        let broken = out.manifest.item("broken").unwrap();
        assert_eq!(broken.name(), Some(""));
        assert_eq!(broken.short_description(), Some(""));
        assert_eq!(broken.language_tag(), Some(""));
    }

    #[tokio::test]
    async fn other_asset_kinds_are_ignored() {
        let files: [(&str, &[u8]); 3] = [
            ("foo.dict", b"d"),
            ("qwerty.json", b"{}"),
            ("notes.txt", b"t"),
        ];
        let out = run_dicts(&Manifest::default(), &files, &DictMetadata::default(), now()).await;

        assert_eq!(ids(&out), ["foo"]);
    }

    #[tokio::test]
    async fn failed_download_aborts_the_pass() {
        let assets = vec![asset("foo.dict", b"x"), asset("gone.dict", b"y")];
        let fetcher = MemoryFetcher::default().with(&url("foo.dict"), b"x");
        let metadata = DictMetadata::default();

        let result = reconcile(
            &Manifest::default(),
            "v1.0",
            &assets,
            MetadataPolicy::Dictionary(&metadata),
            &fetcher,
            now(),
        )
        .await;

        assert!(matches!(
            result,
            Err(FetchError::Status { url, .. }) if url.ends_with("gone.dict")
        ));
    }
}
