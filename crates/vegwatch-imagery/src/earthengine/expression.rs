//! Translation of image recipes into Earth Engine expression graphs.
//!
//! The REST API takes a graph of `ValueNode`s keyed by string ids, with one id
//! marked as the result. Nodes are nested inline except function bodies, which the
//! API requires to be referenced by id.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use vegwatch_core::models::{ImageExpr, Region, SceneQuery};

const MAPPING_VAR: &str = "_MAPPING_VAR_0_0";

/// Builder for one serialized `Expression`
#[derive(Debug, Default)]
pub struct ExpressionGraph {
    values: BTreeMap<String, Value>,
}

impl ExpressionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Value) -> String {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), node);
        key
    }

    /// Finish the graph with `node` as its result
    pub fn finish(mut self, node: Value) -> Value {
        let result = self.push(node);
        json!({ "result": result, "values": self.values })
    }

    /// `ee.Geometry.Polygon` for the region ring, in (longitude, latitude) order
    pub fn geometry(&mut self, region: &Region) -> Value {
        invoke(
            "GeometryConstructors.Polygon",
            [
                ("coordinates", constant(json!([region.ring()]))),
                ("evenOdd", constant(json!(true))),
            ],
        )
    }

    /// Catalog query: `load -> filterBounds -> filterDate -> filter(cloud) -> map(clip)`
    pub fn scene_collection(&mut self, query: &SceneQuery) -> Value {
        let geometry = self.geometry(&query.region);

        let loaded =
            invoke("ImageCollection.load", [("id", constant(json!(query.collection)))]);

        let bounded = filter(
            loaded,
            invoke(
                "Filter.intersects",
                [("leftField", constant(json!(".all"))), ("rightValue", geometry.clone())],
            ),
        );

        let date_range = invoke(
            "DateRange",
            [
                ("start", invoke("Date", [("value", constant(json!(query.window.start_str())))])),
                ("end", invoke("Date", [("value", constant(json!(query.window.end_str())))])),
            ],
        );
        let dated = filter(
            bounded,
            invoke(
                "Filter.dateRangeContains",
                [("leftValue", date_range), ("rightField", constant(json!("system:time_start")))],
            ),
        );

        let clear = filter(
            dated,
            invoke(
                "Filter.lessThan",
                [
                    ("leftField", constant(json!(query.cloud_property))),
                    ("rightValue", constant(json!(query.max_cloud_cover))),
                ],
            ),
        );

        let clip_body = self.push(invoke(
            "Image.clip",
            [("input", json!({ "argumentReference": MAPPING_VAR })), ("geometry", geometry)],
        ));

        invoke(
            "Collection.map",
            [
                ("collection", clear),
                (
                    "baseAlgorithm",
                    json!({
                        "functionDefinitionValue": {
                            "argumentNames": [MAPPING_VAR],
                            "body": clip_body,
                        }
                    }),
                ),
            ],
        )
    }

    /// Number of scenes retained by the query
    pub fn scene_count(&mut self, query: &SceneQuery) -> Value {
        let collection = self.scene_collection(query);
        invoke("Collection.size", [("collection", collection)])
    }

    /// Image node for a recipe
    pub fn image(&mut self, expr: &ImageExpr) -> Value {
        match expr {
            ImageExpr::MedianComposite { query } => {
                let collection = self.scene_collection(query);
                invoke("reduce.median", [("collection", collection)])
            }
            ImageExpr::NormalizedDifference { input, bands, name } => {
                let source = self.image(input);
                let index = invoke(
                    "Image.normalizedDifference",
                    [
                        ("input", source),
                        ("bandNames", constant(json!([bands.positive, bands.negative]))),
                    ],
                );
                rename(index, name)
            }
            ImageExpr::Subtract {
                minuend,
                subtrahend,
                name,
            } => {
                let image1 = self.image(minuend);
                let image2 = self.image(subtrahend);
                let diff = invoke("Image.subtract", [("image1", image1), ("image2", image2)]);
                rename(diff, name)
            }
        }
    }

    /// `image.reduceRegion(ee.Reducer.mean(), region, scale)`
    pub fn mean_over_region(&mut self, expr: &ImageExpr, region: &Region, scale: f64) -> Value {
        let image = self.image(expr);
        let geometry = self.geometry(region);
        invoke(
            "Image.reduceRegion",
            [
                ("image", image),
                ("reducer", invoke("Reducer.mean", [])),
                ("geometry", geometry),
                ("scale", constant(json!(scale))),
            ],
        )
    }

    /// Image clipped to the region bounds and scaled so its longer side is `max_dimension`
    pub fn thumbnail_image(
        &mut self,
        expr: &ImageExpr,
        region: &Region,
        max_dimension: u32,
    ) -> Value {
        let image = self.image(expr);
        let geometry = self.geometry(region);
        invoke(
            "Image.clipToBoundsAndScale",
            [
                ("input", image),
                ("geometry", geometry),
                ("maxDimension", constant(json!(max_dimension))),
            ],
        )
    }
}

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

fn invoke<const N: usize>(function: &str, arguments: [(&str, Value); N]) -> Value {
    let arguments: Map<String, Value> =
        arguments.into_iter().map(|(name, value)| (name.to_string(), value)).collect();
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

fn filter(collection: Value, predicate: Value) -> Value {
    invoke("Collection.filter", [("collection", collection), ("filter", predicate)])
}

fn rename(image: Value, name: &str) -> Value {
    invoke("Image.rename", [("input", image), ("names", constant(json!([name])))])
}

/// Name of the function invoked by the result node of a finished graph
pub fn result_function(expression: &Value) -> Option<&str> {
    let result = expression.get("result")?.as_str()?;
    expression
        .get("values")?
        .get(result)?
        .get("functionInvocationValue")?
        .get("functionName")?
        .as_str()
}
