//! The static catalog of design-server tools offered to the model.
use serde_json::{json, Map, Value};

use crate::models::tool::Tool;

pub const GET_SCREENSHOT: &str = "get_screenshot";
pub const CREATE_DESIGN_SYSTEM_RULES: &str = "create_design_system_rules";
pub const GET_DESIGN_CONTEXT: &str = "get_design_context";
pub const GET_METADATA: &str = "get_metadata";
pub const GET_VARIABLE_DEFS: &str = "get_variable_defs";
pub const GET_FIGJAM: &str = "get_figjam";
pub const GET_CODE_CONNECT_MAP: &str = "get_code_connect_map";
pub const WHOAMI: &str = "whoami";

/// Accepts `123:456`, `123-456`, negative parts, or the empty string.
pub const NODE_ID_PATTERN: &str = r"^$|^(?:-?\d+[:-]-?\d+)$";

const NODE_AND_FILE: &[&str] = &["nodeId", "fileKey"];

fn node_id() -> Value {
    json!({
        "type": "string",
        "pattern": NODE_ID_PATTERN,
        "description": "The ID of the node in the Figma document, eg. \"123:456\" or \"123-456\". This should be a valid node ID in the Figma document."
    })
}

fn file_key() -> Value {
    json!({
        "type": "string",
        "description": "The key of the Figma file to use. If the URL is provided, extract the file key from the URL. The given URL must be in the format https://figma.com/design/:fileKey/:fileName?node-id=:int1-:int2. The extracted fileKey would be `:fileKey`."
    })
}

fn client_languages() -> Value {
    json!({
        "type": "string",
        "description": "A comma separated list of programming languages used by the client in the current context in string form, e.g. `javascript`, `html,css,typescript`, etc. If you do not know, please list `unknown`. This is used for logging purposes to understand which languages are being used. If you are unsure, it is better to list `unknown` than to make a guess."
    })
}

fn client_frameworks() -> Value {
    json!({
        "type": "string",
        "description": "A comma separated list of frameworks used by the client in the current context, e.g. `react`, `vue`, `django` etc. If you do not know, please list `unknown`. This is used for logging purposes to understand which frameworks are being used. If you are unsure, it is better to list `unknown` than to make a guess"
    })
}

fn boolean(description: &str) -> Value {
    json!({ "type": "boolean", "description": description })
}

fn schema(properties: Vec<(&str, Value)>, required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, property)| (name.to_string(), property))
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Node-addressed tools share the same four base properties.
fn node_schema(extra: Vec<(&str, Value)>) -> Value {
    let mut properties = vec![
        ("nodeId", node_id()),
        ("fileKey", file_key()),
        ("clientLanguages", client_languages()),
        ("clientFrameworks", client_frameworks()),
    ];
    properties.extend(extra);
    schema(properties, NODE_AND_FILE)
}

pub fn figma_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            GET_SCREENSHOT,
            "Generate a screenshot for a given node or the currently selected node in the Figma desktop app. Use the nodeId parameter to specify a node id. nodeId parameter is REQUIRED. Use the fileKey parameter to specify the file key. fileKey parameter is REQUIRED. If a URL is provided, extract the file key and node id from the URL. For example, if given the URL https://figma.com/design/pqrs/ExampleFile?node-id=1-2 the extracted fileKey would be `pqrs` and the extracted nodeId would be `1:2`. If the URL is of the format https://figma.com/design/:fileKey/branch/:branchKey/:fileName then use the branchKey as the fileKey.",
            node_schema(vec![]),
        ),
        Tool::new(
            CREATE_DESIGN_SYSTEM_RULES,
            "Provides a prompt to generate design system rules for this repo.",
            schema(
                vec![
                    ("nodeId", node_id()),
                    ("clientLanguages", client_languages()),
                    ("clientFrameworks", client_frameworks()),
                ],
                &[],
            ),
        ),
        Tool::new(
            GET_DESIGN_CONTEXT,
            "Generate UI code for a given node in Figma. Use the nodeId parameter to specify a node id. Use the fileKey parameter to specify the file key. If a URL is provided, extract the node id from the URL, for example, if given the URL https://figma.com/design/:fileKey/:fileName?node-id=1-2, the extracted nodeId would be `1:2` and the fileKey would be `:fileKey`. If the URL is of the format https://figma.com/design/:fileKey/branch/:branchKey/:fileName then use the branchKey as the fileKey. The response will contain a code string and a JSON of download URLs for the assets referenced in the code.",
            node_schema(vec![
                (
                    "forceCode",
                    boolean("Whether code should always be returned, instead of returning just metadata if the output size is too large. Only set this when the user directly requests to force the code."),
                ),
                (
                    "disableCodeConnect",
                    boolean("Whether Code Connect should be used to get the design context. Only set this when the user directly requests to disable Code Connect."),
                ),
            ]),
        ),
        Tool::new(
            GET_METADATA,
            "IMPORTANT: Always prefer to use get_design_context tool. Get metadata for a node or page in the Figma desktop app in XML format. Useful only for getting an overview of the structure, it only includes node IDs, layer types, names, positions and sizes. You can call get_design_context on the node IDs contained in this response. Use the nodeId parameter to specify a node id, it can also be the page id (e.g. 0:1). Extract the node id from the URL, for example, if given the URL https://figma.com/design/:fileKey/:fileName?node-id=1-2, the extracted nodeId would be `1:2`. If the URL is of the format https://figma.com/design/:fileKey/branch/:branchKey/:fileName then use the branchKey as the fileKey.",
            node_schema(vec![]),
        ),
        Tool::new(
            GET_VARIABLE_DEFS,
            "Get variable definitions for a given node id. E.g. {'icon/default/secondary': #949494}Variables are reusable values that can be applied to all kinds of design properties, such as fonts, colors, sizes and spacings. Use the nodeId parameter to specify a node id. Extract the node id from the URL, for example, if given the URL https://figma.com/design/:fileKey/:fileName?node-id=1-2, the extracted nodeId would be `1:2`. If the URL is of the format https://figma.com/design/:fileKey/branch/:branchKey/:fileName then use the branchKey as the fileKey.",
            node_schema(vec![]),
        ),
        Tool::new(
            GET_FIGJAM,
            "Generate UI code for a given FigJam node in Figma. Use the nodeId parameter to specify a node id. Use the fileKey parameter to specify the file key. If a URL is provided, extract the node id from the URL, for example, if given the URL https://figma.com/board/:fileKey/:fileName?node-id=1-2, the extracted nodeId would be `1:2` and the fileKey would be `:fileKey`. IMPORTANT: This tool only works for FigJam files, not other Figma files.",
            node_schema(vec![(
                "includeImagesOfNodes",
                boolean("Whether to include images of nodes in the response"),
            )]),
        ),
        Tool::new(
            GET_CODE_CONNECT_MAP,
            "Get a mapping of {[nodeId]: {codeConnectSrc: e.g. location of component in codebase, codeConnectName: e.g. name of component in codebase} E.g. {'1:2': { codeConnectSrc: 'https://github.com/foo/components/Button.tsx', codeConnectName: 'Button' } }. Use the nodeId parameter to specify a node id. Use the fileKey parameter to specify the file key. If a URL is provided, extract the node id from the URL, for example, if given the URL https://figma.com/design/:fileKey/:fileName?node-id=1-2, the extracted nodeId would be `1:2` and the fileKey would be `:fileKey`.",
            schema(
                vec![
                    ("nodeId", node_id()),
                    ("fileKey", file_key()),
                    (
                        "codeConnectLabel",
                        json!({
                            "type": "string",
                            "description": "The label used to fetch Code Connect information for a particular language or framework when multiple Code Connect mappings exist."
                        }),
                    ),
                ],
                NODE_AND_FILE,
            ),
        ),
        Tool::new(
            WHOAMI,
            "Returns information about the authenticated user. If you are experiencing permission issues with other tools, you can use this tool to get information about who is authenticated and validate the right user is logged in.",
            schema(vec![], &[]),
        ),
    ]
}
