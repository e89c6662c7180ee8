//! Tool and UI-resource registration.
//!
//! Every tool that renders a widget names the resource that holds its
//! template. The links are checked once, when the directory is built.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::{Error, Result};

/// Name of the ROI calculator tool.
pub const CALCULATE_ROI: &str = "calculate_roi";

/// URI of the ROI calculator widget template.
pub const WIDGET_URI: &str = "ui://roi-calculator/widget.html";

/// MIME type identifying an embeddable app surface.
pub const APP_MIME_TYPE: &str = "text/html;profile=mcp-app";

/// Asset path of the built-in widget template.
pub const WIDGET_TEMPLATE: &str = "widget.html";

/// What runs when a registered tool is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CalculateRoi,
}

/// A registered tool and the UI resource it renders into.
#[derive(Debug, Clone)]
pub struct ToolEntry {
    pub kind: ToolKind,
    pub tool: mcp::Tool,
    pub resource_uri: String,
}

/// Origins a widget may reach. Empty means fully self-contained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSecurity {
    pub connect_domains: Vec<String>,
    pub resource_domains: Vec<String>,
}

/// A static UI template addressable by URI.
#[derive(Debug, Clone)]
pub struct UiResource {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    /// Path handed to the asset loader.
    pub template: String,
    pub csp: ContentSecurity,
}

impl UiResource {
    /// `_meta` block describing the resource to the host.
    pub fn meta(&self) -> Value {
        json!({
            "ui": {
                "csp": {
                    "connectDomains": self.csp.connect_domains,
                    "resourceDomains": self.csp.resource_domains,
                }
            }
        })
    }

    pub fn to_mcp(&self) -> mcp::Resource {
        mcp::Resource {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: Some(APP_MIME_TYPE.to_string()),
            meta: Some(self.meta()),
        }
    }
}

/// Tool name → entry and resource URI → resource.
#[derive(Debug, Clone, Default)]
pub struct ToolDirectory {
    tools: BTreeMap<String, ToolEntry>,
    resources: BTreeMap<String, UiResource>,
}

impl ToolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory served by default: the ROI calculator and its widget.
    pub fn builtin() -> Result<Self> {
        let mut directory = Self::new();
        directory.add_resource(UiResource {
            uri: WIDGET_URI.to_string(),
            name: "ROI calculator".to_string(),
            description: Some("Interactive ad-spend ROI calculator".to_string()),
            template: WIDGET_TEMPLATE.to_string(),
            csp: ContentSecurity::default(),
        });
        directory.add_tool(ToolKind::CalculateRoi, calculate_roi_tool(), WIDGET_URI)?;
        Ok(directory)
    }

    /// Register a UI resource, replacing any resource at the same URI.
    pub fn add_resource(&mut self, resource: UiResource) {
        self.resources.insert(resource.uri.clone(), resource);
    }

    /// Register a tool linked to an already registered resource.
    ///
    /// The link is also written into the tool's `_meta.ui.resourceUri`.
    pub fn add_tool(&mut self, kind: ToolKind, mut tool: mcp::Tool, resource_uri: &str) -> Result<()> {
        if self.tools.contains_key(&tool.name) {
            return Err(Error::DuplicateTool(tool.name));
        }
        if !self.resources.contains_key(resource_uri) {
            return Err(Error::UnknownResource {
                tool: tool.name,
                uri: resource_uri.to_string(),
            });
        }

        let mut meta = tool.meta.take().unwrap_or_else(|| json!({}));
        if let Some(object) = meta.as_object_mut() {
            object.insert("ui".to_string(), json!({ "resourceUri": resource_uri }));
        }
        tool.meta = Some(meta);

        self.tools.insert(
            tool.name.clone(),
            ToolEntry {
                kind,
                tool,
                resource_uri: resource_uri.to_string(),
            },
        );
        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    pub fn resource(&self, uri: &str) -> Option<&UiResource> {
        self.resources.get(uri)
    }

    /// The UI resource a tool renders into.
    pub fn resource_for_tool(&self, name: &str) -> Option<&UiResource> {
        self.tool(name).and_then(|entry| self.resource(&entry.resource_uri))
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolEntry> {
        self.tools.values()
    }

    pub fn resources(&self) -> impl Iterator<Item = &UiResource> {
        self.resources.values()
    }
}

fn calculate_roi_tool() -> mcp::Tool {
    let defaults = calc::ParameterSet::default();
    mcp::Tool {
        name: CALCULATE_ROI.to_string(),
        description: Some(
            "Calculate clicks, conversions, revenue, profit and ROI for a monthly ad budget, \
             with a profit curve across budget scenarios."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "monthlyBudget": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "default": defaults.monthly_budget,
                    "description": "Monthly ad spend"
                },
                "cpc": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "default": defaults.cpc,
                    "description": "Cost per click"
                },
                "conversionRatePercent": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 100,
                    "default": defaults.conversion_rate_percent,
                    "description": "Share of clicks that convert, in percent"
                },
                "averageOrderValue": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "default": defaults.average_order_value,
                    "description": "Revenue per conversion"
                }
            },
            "additionalProperties": false
        }),
        meta: None,
    }
}
