use geo::{Point, Rect, coord};
use spatio_tiles::{
    Config, Feature, Geographic, Headers, LoadError, Projection, StaticLoader, TileCoord,
    TileRequest, TileSource, TileStatus, TilingScheme, WebMercatorTiling,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn source_with(config: Config) -> TileSource {
    let loader = |request: TileRequest| async move {
        Ok::<_, LoadError>(vec![Feature::new(request.coord.to_string(), Point::new(0.0, 0.0))])
    };
    TileSource::builder(loader).config(config).build()
}

/// Test 1: Loader panics are contained to the tile
#[tokio::test]
async fn test_panicking_loader() {
    init_logging();
    let loader = |request: TileRequest| async move {
        if request.coord.x == 13 {
            panic!("corrupt tile payload");
        }
        Ok::<_, LoadError>(vec![Feature::new("ok", Point::new(0.0, 0.0))])
    };
    let source = TileSource::builder(loader)
        .config(Config::default().with_base_levels([10]))
        .build();
    let headers = Headers::new();

    assert!(
        source
            .get_features_for_tile(TileCoord::new(10, 13, 0), &headers)
            .await
            .is_empty()
    );
    assert!(matches!(
        source.tile_status(TileCoord::new(10, 13, 0)),
        Some(TileStatus::Failed(_))
    ));

    let fine = source
        .get_features_for_tile(TileCoord::new(10, 14, 0), &headers)
        .await;
    assert_eq!(fine.len(), 1);
}

/// Test 2: Features without usable geometry are never indexed
#[tokio::test]
async fn test_features_without_geometry() {
    let loader = |_request: TileRequest| async move {
        let mut missing = Feature::new("missing", Point::new(0.0, 0.0));
        missing.geometry = None;
        Ok::<_, LoadError>(vec![
            missing,
            Feature::new("nan", Point::new(f64::NAN, 1.0)),
            Feature::new("valid", Point::new(1.0, 1.0)),
        ])
    };
    let source = TileSource::builder(loader)
        .config(Config::default().with_base_levels([10]))
        .build();

    let features = source
        .get_features_for_tile(TileCoord::new(10, 0, 0), &Headers::new())
        .await;
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].id, "valid");
    assert!(source.tiles_for_feature("missing").is_empty());
}

/// Test 3: Features without an id get a generated one
#[tokio::test]
async fn test_generated_feature_ids() {
    let loader = |_request: TileRequest| async move {
        Ok::<_, LoadError>(vec![
            Feature::anonymous(Point::new(1.0, 1.0)),
            Feature::anonymous(Point::new(2.0, 2.0)),
        ])
    };
    let source = TileSource::builder(loader)
        .config(Config::default().with_base_levels([10]))
        .build();
    let tile = TileCoord::new(10, 0, 0);

    let features = source.get_features_for_tile(tile, &Headers::new()).await;
    assert_eq!(features.len(), 2);
    assert!(features.iter().all(|feature| !feature.id.is_empty()));
    assert_ne!(features[0].id, features[1].id);
    assert_eq!(source.tiles_for_feature(&features[0].id), vec![tile.key()]);
}

/// Test 4: Non-finite query input yields nothing and loads nothing
#[tokio::test]
async fn test_non_finite_queries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let loader = move |_request: TileRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, LoadError>(Vec::new()) }
    };
    let source = TileSource::builder(loader)
        .config(Config::default().with_base_levels([10]))
        .build();
    let headers = Headers::new();

    let by_coordinate = source
        .get_features_by_coordinate(coord! { x: f64::NAN, y: 0.0 }, 10.0, &headers)
        .await;
    assert!(by_coordinate.is_empty());

    let extent = Rect::new(coord! { x: f64::NEG_INFINITY, y: 0.0 }, coord! { x: 0.0, y: 1.0 });
    assert!(source.get_features_for_extent(extent, None, &headers).await.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Test 5: Out-of-range configuration is clamped instead of rejected
#[tokio::test]
async fn test_invalid_configuration() {
    let source = source_with(
        Config::default()
            .with_tile_cache_size(0)
            .with_base_levels([99])
            .with_tile_size(0),
    );
    assert_eq!(source.cache_capacity(), 1);
    assert_eq!(source.base_levels().levels(), &[24]);
    assert_eq!(source.config().tile_size, 256);

    let source = source_with(Config::default().with_base_levels(Vec::<u32>::new()));
    assert_eq!(source.base_levels().levels(), &[15]);
}

/// Test 6: Configuration from JSON
#[tokio::test]
async fn test_configuration_from_json() {
    let config = Config::from_json(r#"{ "tile_cache_size": 3, "base_levels": [9, 13] }"#).unwrap();
    let source = source_with(config);
    assert_eq!(source.base_levels().levels(), &[13, 9]);
    assert_eq!(source.cache_capacity(), 3);

    assert!(Config::from_json(r#"{ "tile_cache_sise": 3 }"#).is_err());
}

/// Test 7: Levels between two base levels are answered from the coarser one
#[tokio::test]
async fn test_level_between_base_levels() {
    let source = source_with(Config::default().with_base_levels([8, 14]));
    let headers = Headers::new();

    // 11 sits between 8 and 14; the level-8 ancestor is loaded.
    source
        .get_features_for_tile(TileCoord::new(11, 1024, 1024), &headers)
        .await;
    assert_eq!(source.cached_tile_keys(), vec![TileCoord::new(8, 128, 128).key()]);
    assert_eq!(source.cached_tiles_at(14), 0);
}

/// Test 8: Aggregated tiles can repeat features that span children
#[tokio::test]
async fn test_aggregation_keeps_duplicates() {
    let source = source_with(Config::default().with_base_levels([4]));
    let from_children = source
        .get_features_for_tile(TileCoord::new(3, 0, 0), &Headers::new())
        .await;
    assert_eq!(from_children.len(), 4);

    let shared = |_request: TileRequest| async move {
        Ok::<_, LoadError>(vec![Feature::new("everywhere", Point::new(0.0, 0.0))])
    };
    let source = TileSource::builder(shared)
        .config(Config::default().with_base_levels([4]))
        .build();
    let features = source
        .get_features_for_tile(TileCoord::new(2, 0, 0), &Headers::new())
        .await;
    assert_eq!(features.len(), 16);
    assert!(features.iter().all(|feature| feature.id == "everywhere"));
    assert_eq!(source.tiles_for_feature("everywhere").len(), 16);
}

/// Test 9: Geographic projection with a static feature set
#[tokio::test]
async fn test_geographic_projection() {
    let loader = StaticLoader::new(
        vec![
            Feature::new("paris", Point::new(2.3522, 48.8566)),
            Feature::new("tokyo", Point::new(139.6917, 35.6895)),
        ],
        Arc::new(WebMercatorTiling),
        Arc::new(Geographic),
    );
    let source = TileSource::builder(loader)
        .config(Config::default().with_base_levels([5]))
        .projection(Geographic)
        .build();

    let paris = coord! { x: 2.3522, y: 48.8566 };
    assert_eq!(Geographic.project(paris), paris);

    let features = source
        .get_features_by_coordinate(paris, 0.01, &Headers::new())
        .await;
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].id, "paris");

    let tile = WebMercatorTiling.position_to_tile(paris, 5);
    let status = source.tile_status(tile);
    assert_eq!(status, Some(TileStatus::Loaded));
}

/// Test 10: Stats reflect hits, loads and evictions
#[tokio::test]
async fn test_stats() {
    let source = source_with(Config::default().with_base_levels([10]).with_tile_cache_size(1));
    let headers = Headers::new();

    source.get_features_for_tile(TileCoord::new(10, 0, 0), &headers).await;
    source.get_features_for_tile(TileCoord::new(10, 0, 0), &headers).await;
    source.get_features_for_tile(TileCoord::new(10, 1, 0), &headers).await;

    let stats = source.stats();
    assert_eq!(stats.loads_started, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.cached_tiles, 1);
    assert_eq!(stats.resolved_tiles, 1);
    assert!((stats.hit_ratio() - 1.0 / 3.0).abs() < 1e-9);
}

#[cfg(feature = "geojson")]
#[tokio::test]
async fn test_geojson_loader() {
    let loader = |_request: TileRequest| async move {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": 7, "geometry": { "type": "Point", "coordinates": [10.0, 20.0] }, "properties": { "kind": "poi" } }
            ]
        }"#;
        Ok::<_, LoadError>(spatio_tiles::features_from_geojson_str(json)?)
    };
    let source = TileSource::builder(loader)
        .config(Config::default().with_base_levels([10]))
        .build();

    let features = source
        .get_features_for_tile(TileCoord::new(10, 0, 0), &Headers::new())
        .await;
    assert_eq!(features[0].id, "7");
    assert_eq!(features[0].property("kind"), Some(&serde_json::json!("poi")));
}

/// Test 11: Tile coordinates outside the level's grid answer empty
#[tokio::test]
async fn test_out_of_range_tiles() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let loader = move |_request: TileRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, LoadError>(vec![Feature::new("f", Point::new(0.0, 0.0))]) }
    };
    let source = TileSource::builder(loader)
        .config(Config::default().with_base_levels([10]))
        .build();
    let headers = Headers::new();

    for tile in [
        TileCoord::new(9, u32::MAX, 0),
        TileCoord::new(8, 0, u32::MAX),
        TileCoord::new(10, 1024, 0),
        TileCoord::new(13, 0, 1 << 13),
    ] {
        assert!(source.get_features_for_tile(tile, &headers).await.is_empty());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(source.cached_tile_keys().is_empty());
}

/// Test 12: Extent levels beyond the deepest supported level are clamped
#[tokio::test]
async fn test_extent_level_is_clamped() {
    let source = source_with(Config::default().with_base_levels([10]));
    let extent = Rect::new(coord! { x: 1000.0, y: 1000.0 }, coord! { x: 1001.0, y: 1001.0 });

    let deep = source.tiles_in_extent(extent, 40);
    assert_eq!(deep, source.tiles_in_extent(extent, 24));
    assert!(!deep.is_empty());
    assert!(deep.iter().all(|tile| tile.level == 24 && tile.in_range()));

    assert_eq!(source.tiles_in_extent(extent, u32::MAX), deep);
}
