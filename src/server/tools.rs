//! MCP Server tools for chart computation

use std::sync::Arc;

use rmcp::{
    RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use schemars::schema_for;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::ChartError;
use crate::models::{
    BatchRequest, BodyEventQuery, ChartRequest, ComparisonQuery, EphemerisQuery, MoonPhaseQuery,
    PatternQuery, ProgressionQuery, TransitQuery,
};
use crate::service::{calculate_batch, Cancellation, ChartService};

fn schema_to_value<T: schemars::JsonSchema>() -> Arc<serde_json::Map<String, Value>> {
    let schema = schema_for!(T);
    match serde_json::to_value(schema) {
        Ok(Value::Object(map)) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    }
}

fn empty_schema() -> Arc<serde_json::Map<String, Value>> {
    let mut map = serde_json::Map::new();
    map.insert("type".into(), Value::String("object".into()));
    map.insert("properties".into(), Value::Object(serde_json::Map::new()));
    Arc::new(map)
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, rmcp::ErrorData> {
    serde_json::from_value(args).map_err(|e| rmcp::ErrorData::invalid_params(e.to_string(), None))
}

/// Serialize a payload, or the error descriptor in its place
fn render<T: Serialize>(outcome: Result<T, ChartError>) -> String {
    let value = match outcome.and_then(|payload| {
        serde_json::to_value(&payload)
            .map_err(|e| ChartError::Internal(format!("Cannot serialize result: {}", e)))
    }) {
        Ok(value) => value,
        Err(e) => {
            debug!("Tool call failed: {}", e);
            json!({
                "success": false,
                "error": e.descriptor(),
            })
        }
    };
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| {
        error!("Cannot render tool result: {}", e);
        format!(
            r#"{{"success": false, "error": {{"kind": "internal", "reason": "{}"}}}}"#,
            e
        )
    })
}

/// MCP Server for chart computation
#[derive(Clone)]
pub struct AstrolabeServer {
    service: Arc<ChartService>,
}

impl AstrolabeServer {
    pub fn new(service: Arc<ChartService>) -> Self {
        Self { service }
    }

    /// Run synchronous chart work on the blocking pool
    async fn blocking<T, F>(&self, work: F) -> String
    where
        T: Serialize + Send + 'static,
        F: FnOnce(&ChartService, &Cancellation) -> Result<T, ChartError> + Send + 'static,
    {
        let service = self.service.clone();
        let outcome = tokio::task::spawn_blocking(move || work(&service, &Cancellation::none()))
            .await
            .unwrap_or_else(|e| Err(ChartError::Internal(format!("Worker failed: {}", e))));
        render(outcome)
    }

    async fn dispatch(&self, name: &str, args: Value) -> Result<String, rmcp::ErrorData> {
        let result = match name {
            "calculate_chart" => {
                let input: ChartRequest = parse_args(args)?;
                self.blocking(move |service, cancel| service.calculate_chart(&input, cancel))
                    .await
            }
            "batch_calculate_charts" => {
                let input: BatchRequest = parse_args(args)?;
                render(calculate_batch(self.service.clone(), input).await)
            }
            "find_aspect_patterns" => {
                let input: PatternQuery = parse_args(args)?;
                self.blocking(move |service, cancel| {
                    let patterns = service.find_patterns(&input, cancel)?;
                    Ok(json!({ "count": patterns.len(), "patterns": patterns }))
                })
                .await
            }
            "find_transits" => {
                let input: TransitQuery = parse_args(args)?;
                self.blocking(move |service, cancel| {
                    let events = service.find_transits(&input, cancel)?;
                    Ok(json!({ "count": events.len(), "events": events }))
                })
                .await
            }
            "calculate_progressions" => {
                let input: ProgressionQuery = parse_args(args)?;
                self.blocking(move |service, cancel| service.calculate_progressions(&input, cancel))
                    .await
            }
            "get_moon_phases" => {
                let input: MoonPhaseQuery = parse_args(args)?;
                self.blocking(move |service, cancel| {
                    let events = service.moon_phases(&input, cancel)?;
                    Ok(json!({ "count": events.len(), "phases": events }))
                })
                .await
            }
            "get_retrograde_periods" => {
                let input: BodyEventQuery = parse_args(args)?;
                self.blocking(move |service, cancel| {
                    let periods = service.retrograde_periods(&input, cancel)?;
                    Ok(json!({ "count": periods.len(), "periods": periods }))
                })
                .await
            }
            "get_sign_ingresses" => {
                let input: BodyEventQuery = parse_args(args)?;
                self.blocking(move |service, cancel| {
                    let events = service.sign_ingresses(&input, cancel)?;
                    Ok(json!({ "count": events.len(), "ingresses": events }))
                })
                .await
            }
            "compare_charts" => {
                let input: ComparisonQuery = parse_args(args)?;
                self.blocking(move |service, cancel| service.compare(&input, cancel))
                    .await
            }
            "get_ephemeris" => {
                let input: EphemerisQuery = parse_args(args)?;
                self.blocking(move |service, cancel| {
                    let rows = service.ephemeris_table(&input, cancel)?;
                    Ok(json!({ "count": rows.len(), "rows": rows }))
                })
                .await
            }
            "get_chart_info" => render(Ok(self.service.chart_info())),
            "get_cache_stats" => render(Ok(self.service.cache_stats())),
            _ => {
                return Err(rmcp::ErrorData::invalid_params(
                    format!("Unknown tool: {}", name),
                    None,
                ))
            }
        };
        Ok(result)
    }

    fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "calculate_chart",
                "Calculate a natal, transit, solar return, lunar return or progressed chart with planetary positions, house cusps, aspects and aspect patterns.",
                schema_to_value::<ChartRequest>(),
            ),
            Tool::new(
                "batch_calculate_charts",
                "Calculate many charts concurrently. Results keep the input order; a failing request only fails its own slot.",
                schema_to_value::<BatchRequest>(),
            ),
            Tool::new(
                "find_aspect_patterns",
                "Find aspect patterns (grand trine, T-square, yod, grand cross, kite, mystic rectangle) in a chart.",
                schema_to_value::<PatternQuery>(),
            ),
            Tool::new(
                "find_transits",
                "Find the exact times transiting planets aspect the points of a natal chart within a date range.",
                schema_to_value::<TransitQuery>(),
            ),
            Tool::new(
                "calculate_progressions",
                "Calculate a secondary, tertiary, minor or solar arc progressed chart for a target date.",
                schema_to_value::<ProgressionQuery>(),
            ),
            Tool::new(
                "get_moon_phases",
                "Find the exact times of new, first quarter, full and last quarter moons within a date range.",
                schema_to_value::<MoonPhaseQuery>(),
            ),
            Tool::new(
                "get_retrograde_periods",
                "Find retrograde stations and shadow periods of planets within a date range.",
                schema_to_value::<BodyEventQuery>(),
            ),
            Tool::new(
                "get_sign_ingresses",
                "Find when planets enter new zodiac signs within a date range.",
                schema_to_value::<BodyEventQuery>(),
            ),
            Tool::new(
                "compare_charts",
                "Compare two charts as a synastry (aspects between them) or a composite (midpoint chart).",
                schema_to_value::<ComparisonQuery>(),
            ),
            Tool::new(
                "get_ephemeris",
                "Tabulate planetary longitudes at an hourly, daily or weekly interval.",
                schema_to_value::<EphemerisQuery>(),
            ),
            Tool::new(
                "get_chart_info",
                "List the supported chart types, progressions, house systems, objects, aspects with their default orbs, patterns and dignities.",
                empty_schema(),
            ),
            Tool::new(
                "get_cache_stats",
                "Report result cache size, hits, misses and evictions.",
                empty_schema(),
            ),
        ]
    }
}

impl ServerHandler for AstrolabeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Astrolabe - MCP Server computing astrological charts on the Swiss Ephemeris. \
                 Use calculate_chart for single charts, batch_calculate_charts for many, and \
                 the find_/get_ tools to locate transits, phases, stations and ingresses in time."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::ErrorData> {
        Ok(ListToolsResult {
            tools: self.get_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args: Value = Value::Object(request.arguments.clone().unwrap_or_default());
        let result = self.dispatch(request.name.as_ref(), args).await?;
        Ok(CallToolResult::success(vec![Content::text(result)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::ephemeris::synthetic::SyntheticEphemeris;
    use crate::models::{AspectType, Body, HouseSystem};

    fn server() -> AstrolabeServer {
        let service = ChartService::new(Arc::new(SyntheticEphemeris::new()), Settings::default());
        AstrolabeServer::new(Arc::new(service))
    }

    #[test]
    fn test_every_tool_has_an_object_schema() {
        let tools = server().get_tools();
        assert_eq!(tools.len(), 12);
        for tool in tools {
            assert_eq!(
                tool.input_schema.get("type"),
                Some(&Value::String("object".into())),
                "{}",
                tool.name
            );
        }
    }

    #[tokio::test]
    async fn test_calculate_chart_payload() {
        let output = server()
            .dispatch(
                "calculate_chart",
                json!({ "datetime": "2000-01-01T12:00:00", "latitude": "51.5N", "longitude": 0.0 }),
            )
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert!(value["chart"]["objects"]["sun"].is_object());
        assert!(value["aspects"].is_array());
        assert_eq!(value["houses"].as_array().map(Vec::len), Some(12));
        let placed: usize = value["houses"]
            .as_array()
            .unwrap()
            .iter()
            .map(|house| house["objects"].as_array().map_or(0, Vec::len))
            .sum();
        assert!(placed >= 10);
    }

    #[tokio::test]
    async fn test_errors_are_structured() {
        let output = server()
            .dispatch(
                "calculate_chart",
                json!({ "datetime": "yesterday", "latitude": 0.0, "longitude": 0.0 }),
            )
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"]["kind"], json!("input_validation"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_and_unknown_tools() {
        let server = server();
        assert!(server
            .dispatch("calculate_chart", json!({ "latitude": 0.0 }))
            .await
            .is_err());
        assert!(server.dispatch("no_such_tool", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_chart_info_lists_every_variant() {
        let output = server().dispatch("get_chart_info", json!({})).await.unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        for system in HouseSystem::ALL {
            assert!(value["house_systems"]
                .as_array()
                .unwrap()
                .contains(&serde_json::to_value(system).unwrap()));
        }
        let objects: Vec<&Value> = value["objects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| &entry["object"])
            .collect();
        for body in Body::all() {
            assert!(objects.contains(&&serde_json::to_value(body).unwrap()), "{}", body);
        }
        let aspects = value["aspects"].as_array().unwrap();
        for aspect in AspectType::ALL {
            let entry = aspects
                .iter()
                .find(|entry| entry["aspect"] == serde_json::to_value(aspect).unwrap())
                .unwrap();
            assert!(entry["default_orb"].is_number(), "{}", aspect);
        }
    }

    #[tokio::test]
    async fn test_batch_tool_reports_slots() {
        let output = server()
            .dispatch(
                "batch_calculate_charts",
                json!({
                    "requests": [
                        { "datetime": "2000-01-01T12:00:00", "latitude": 0.0, "longitude": 0.0 },
                        { "datetime": "bad", "latitude": 0.0, "longitude": 0.0 }
                    ]
                }),
            )
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["succeeded"], json!(1));
        assert_eq!(value["results"][0]["status"], json!("ok"));
        assert_eq!(value["results"][1]["status"], json!("error"));
    }
}
