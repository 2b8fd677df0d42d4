//! Integration tests for aggregations
//!
//! Runs nested aggregation trees over real indexes and checks the JSON
//! result shape.

use quarry::{
    AnalyzerRegistry, EngineSettings, FieldMapping, Index, IndexMapping, SearchError,
    SearchRequest,
};
use roaring::RoaringBitmap;
use serde_json::{json, Value};

fn setup_shop() -> Index {
    let mapping = IndexMapping::new()
        .with_field("name", FieldMapping::text(["unicode", "lowercase", "dedup"]))
        .with_field("category", FieldMapping::keyword())
        .with_field("price", FieldMapping::double())
        .with_field("in_stock", FieldMapping::boolean())
        .with_field(
            "vendor",
            FieldMapping::map()
                .with_child("country", FieldMapping::keyword())
                .with_child("rating", FieldMapping::long()),
        );
    let index = Index::new("shop", mapping, &AnalyzerRegistry::default(), EngineSettings::default())
        .unwrap();

    let products = vec![
        json!({ "name": "Red apple", "category": "fruit", "price": 1.5, "in_stock": true, "vendor": { "country": "nz", "rating": 4 } }),
        json!({ "name": "Green apple", "category": "fruit", "price": 1.2, "in_stock": true, "vendor": { "country": "nz", "rating": 5 } }),
        json!({ "name": "Banana", "category": "fruit", "price": 0.5, "in_stock": false, "vendor": { "country": "ec", "rating": 3 } }),
        json!({ "name": "Cherry", "category": "fruit", "price": 8.0, "in_stock": true, "vendor": { "country": "cl", "rating": 4 } }),
        json!({ "name": "Carrot", "category": "vegetable", "price": 0.8, "in_stock": true, "vendor": { "country": "nz", "rating": 2 } }),
        json!({ "name": "Leek", "category": "vegetable", "price": 2.1, "in_stock": false }),
        json!({ "name": "Potato", "category": "vegetable", "price": 0.3, "in_stock": true }),
        json!({ "name": "Sourdough bread", "category": "bakery", "price": 6.0, "in_stock": true }),
        json!({ "name": "Croissant", "category": "bakery", "price": 2.5, "in_stock": false }),
        json!({ "name": "Honey", "category": "pantry", "price": 12.0, "in_stock": true }),
    ];
    for (i, product) in products.into_iter().enumerate() {
        index
            .add_document(i as u32 + 1, product.as_object().unwrap())
            .unwrap();
    }
    index
}

fn to_json(index: &Index, request: SearchRequest) -> Value {
    serde_json::to_value(index.execute(&request).unwrap()).unwrap()
}

#[test]
fn test_terms_ordering() {
    let index = setup_shop();
    let response = to_json(
        &index,
        SearchRequest::new()
            .with_limit(0)
            .with_aggs(json!({ "categories": { "type": "terms", "field": "category", "size": 2 } })),
    );

    assert_eq!(response["total"], json!(10));
    assert_eq!(response["hits"], json!([]));
    assert_eq!(
        response["aggs"]["categories"],
        json!({ "buckets": [
            { "key": "fruit", "docCount": 4 },
            { "key": "vegetable", "docCount": 3 }
        ] })
    );
}

#[test]
fn test_aggregations_follow_query() {
    let index = setup_shop();
    let response = to_json(
        &index,
        SearchRequest::new()
            .with_query(json!({ "term": { "in_stock": true } }))
            .with_aggs(json!({
                "categories": { "type": "terms", "field": "category" },
                "cheapest": { "type": "min", "field": "price" },
                "priciest": { "type": "max", "field": "price" }
            })),
    );

    assert_eq!(response["total"], json!(7));
    assert_eq!(
        response["aggs"]["categories"]["buckets"],
        json!([
            { "key": "fruit", "docCount": 3 },
            { "key": "vegetable", "docCount": 2 },
            { "key": "bakery", "docCount": 1 },
            { "key": "pantry", "docCount": 1 }
        ])
    );
    assert_eq!(response["aggs"]["cheapest"], json!({ "value": 0.3 }));
    assert_eq!(response["aggs"]["priciest"], json!({ "value": 12.0 }));
}

#[test]
fn test_range_buckets() {
    let index = setup_shop();
    let response = to_json(
        &index,
        SearchRequest::new().with_limit(0).with_aggs(json!({
            "prices": {
                "type": "range",
                "field": "price",
                "ranges": [
                    { "key": "cheap", "to": 1.0 },
                    { "key": "mid", "from": 1.0, "to": 5.0 },
                    { "key": "premium", "from": 5.0 }
                ],
                "aggs": { "top": { "type": "max", "field": "price" } }
            }
        })),
    );

    assert_eq!(
        response["aggs"]["prices"],
        json!({ "buckets": [
            { "key": "cheap", "to": 1.0, "docCount": 3, "aggs": { "top": { "value": 0.8 } } },
            { "key": "mid", "from": 1.0, "to": 5.0, "docCount": 4, "aggs": { "top": { "value": 2.5 } } },
            { "key": "premium", "from": 5.0, "docCount": 3, "aggs": { "top": { "value": 12.0 } } }
        ] })
    );
}

#[test]
fn test_nested_filter_sees_filtered_documents() {
    let index = setup_shop();
    let response = to_json(
        &index,
        SearchRequest::new().with_limit(0).with_aggs(json!({
            "fruit": {
                "type": "filter",
                "filter": { "term": { "category": "fruit" } },
                "aggs": {
                    "countries": {
                        "type": "terms",
                        "field": "vendor.country",
                        "aggs": {
                            "best": { "type": "max", "field": "vendor.rating" }
                        }
                    },
                    "out_of_stock": {
                        "type": "filter",
                        "filter": { "term": { "in_stock": false } }
                    }
                }
            }
        })),
    );

    assert_eq!(
        response["aggs"]["fruit"],
        json!({
            "docCount": 4,
            "aggs": {
                "countries": { "buckets": [
                    { "key": "nz", "docCount": 2, "aggs": { "best": { "value": 5 } } },
                    { "key": "cl", "docCount": 1, "aggs": { "best": { "value": 4 } } },
                    { "key": "ec", "docCount": 1, "aggs": { "best": { "value": 3 } } }
                ] },
                "out_of_stock": { "docCount": 1 }
            }
        })
    );
}

#[test]
fn test_min_max_recurse_into_holders() {
    let index = setup_shop();
    let response = to_json(
        &index,
        SearchRequest::new().with_limit(0).with_aggs(json!({
            "best_rating": {
                "type": "max",
                "field": "vendor.rating",
                "aggs": { "who": { "type": "terms", "field": "category" } }
            }
        })),
    );
    assert_eq!(
        response["aggs"]["best_rating"],
        json!({ "value": 5, "aggs": { "who": { "buckets": [{ "key": "fruit", "docCount": 1 }] } } })
    );
}

#[test]
fn test_terms_over_text_tokens() {
    let index = setup_shop();
    let response = to_json(
        &index,
        SearchRequest::new().with_limit(0).with_aggs(json!({
            "words": { "type": "terms", "field": "name", "size": 1 }
        })),
    );
    assert_eq!(
        response["aggs"]["words"],
        json!({ "buckets": [{ "key": "apple", "docCount": 2 }] })
    );
}

#[test]
fn test_aggregate_over_explicit_set() {
    let index = setup_shop();
    let docs: RoaringBitmap = [8u32, 9, 10].into_iter().collect();
    let results = index
        .aggregate(&json!({ "c": { "type": "terms", "field": "category" } }), &docs)
        .unwrap();
    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(
        json,
        json!({ "c": { "buckets": [
            { "key": "bakery", "docCount": 2 },
            { "key": "pantry", "docCount": 1 }
        ] } })
    );

    let empty = index
        .aggregate(
            &json!({ "m": { "type": "min", "field": "price" } }),
            &RoaringBitmap::new(),
        )
        .unwrap();
    assert!(empty["m"].value().unwrap().is_null());
}

#[test]
fn test_aggregation_errors_abort_request() {
    let index = setup_shop();

    let syntax = index
        .execute(&SearchRequest::new().with_aggs(json!({
            "outer": { "type": "filter", "filter": { "term": { "category": "fruit" } }, "aggs": {
                "inner": { "type": "terms" }
            } }
        })))
        .unwrap_err();
    assert!(matches!(syntax, SearchError::Syntax { .. }));
    assert_eq!(syntax.path(), Some("aggs.outer.aggs.inner"));

    let validation = index
        .execute(&SearchRequest::new().with_aggs(json!({
            "p": { "type": "range", "field": "price", "ranges": [{ "key": "x", "to": "lots" }] }
        })))
        .unwrap_err();
    assert!(matches!(validation, SearchError::Validation { .. }));
    assert_eq!(validation.path(), Some("aggs.p.ranges[0].to"));
}

#[test]
fn test_terms_size_larger_than_memory() {
    let index = setup_shop();
    let docs: RoaringBitmap = [1u32, 5].into_iter().collect();
    for size in [json!(1_000_000_000_000u64), json!(u64::MAX)] {
        let results = index
            .aggregate(
                &json!({ "c": { "type": "terms", "field": "category", "size": size } }),
                &docs,
            )
            .unwrap();
        assert_eq!(
            serde_json::to_value(&results).unwrap(),
            json!({ "c": { "buckets": [
                { "key": "fruit", "docCount": 1 },
                { "key": "vegetable", "docCount": 1 }
            ] } })
        );
    }
}
