use std::collections::HashMap;

use futures::future::BoxFuture;
use sandbox_runtime::{CompiledUnit, NodeKind, RegistryEntry};
use sheet_model::{GraphRepository, Node, NodeData, NodeVariant, PortKey, Sheet, SheetRef};

use crate::error::CodegenError;
use crate::identifier::{sanitize, NameTable};

/// Reserved so a `function` node's own label can never shadow a restricted
/// evaluator builtin.
const RESERVED_NAMES: &[&str] = &[
    "math_sqrt", "math_pow", "math_floor", "math_ceil", "math_log", "math_log2", "math_log10",
    "math_sin", "math_cos", "math_tan", "math_atan2", "math_radians", "math_degrees", "math_pi",
    "math_e", "json_dumps", "json_loads", "random_uniform", "functools_reduce",
];

pub struct Compiler<'a> {
    repository: &'a dyn GraphRepository,
    cache: HashMap<SheetRef, CompiledUnit>,
    stack: Vec<SheetRef>,
}

impl<'a> Compiler<'a> {
    pub fn new(repository: &'a dyn GraphRepository) -> Self {
        Self {
            repository,
            cache: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Boxed because `compile_sheet` calls back into `compile` for every
    /// nested `sheet` node: an `async fn` calling itself would need an
    /// infinitely-sized future without this indirection.
    pub fn compile(&mut self, sheet_ref: SheetRef) -> BoxFuture<'_, Result<CompiledUnit, CodegenError>> {
        Box::pin(async move {
            if let Some(cached) = self.cache.get(&sheet_ref) {
                return Ok(cached.clone());
            }
            if self.stack.contains(&sheet_ref) {
                return Err(CodegenError::Cycle(sheet_ref.sheet_id));
            }

            let sheet = self.fetch(sheet_ref).await?;

            self.stack.push(sheet_ref);
            let unit = self.compile_sheet(&sheet).await;
            self.stack.pop();
            let unit = unit?;

            self.cache.insert(sheet_ref, unit.clone());
            Ok(unit)
        })
    }

    async fn fetch(&self, sheet_ref: SheetRef) -> Result<Sheet, CodegenError> {
        let sheet = match sheet_ref.version_id {
            Some(version_id) => self.repository.fetch_version(version_id).await?,
            None => self.repository.fetch_sheet(sheet_ref.sheet_id).await?,
        };
        Ok(sheet)
    }

    async fn compile_sheet(&mut self, sheet: &Sheet) -> Result<CompiledUnit, CodegenError> {
        let mut names = NameTable::new();
        names.reserve_all(RESERVED_NAMES.iter().copied());

        let mut defs = Vec::new();
        let mut entries = Vec::new();

        for node in &sheet.nodes {
            if node.is_comment() {
                entries.push(RegistryEntry {
                    node_id: node.id,
                    label: node.label.clone(),
                    kind: NodeKind::Comment,
                });
                continue;
            }

            let kind = match node.variant {
                NodeVariant::Constant => constant_kind(&node.data),
                NodeVariant::Input => input_kind(&node.data),
                NodeVariant::Output => NodeKind::Output,
                NodeVariant::Lut => lut_kind(node),
                NodeVariant::Function => {
                    let starlark_name = names.claim(&function_name(node));
                    let def_text = emit_function_def(node, &starlark_name);
                    let def_text = match sandbox_runtime::check_def_syntax(&def_text) {
                        Ok(()) => def_text,
                        Err(message) => emit_function_parse_failure(node, &starlark_name, &message),
                    };
                    defs.push(def_text);
                    NodeKind::Function {
                        starlark_name,
                        input_ports: node.input_ports.clone(),
                        output_ports: node.output_ports.clone(),
                    }
                }
                NodeVariant::Sheet => {
                    let nested_ref = nested_sheet_ref(node)?;
                    let nested = self.compile(nested_ref).await?;
                    let (input_map, output_map) = nested_port_maps(&nested, node);
                    NodeKind::Sheet {
                        nested: Box::new(nested),
                        input_map,
                        output_map,
                    }
                }
                NodeVariant::Comment => unreachable!("handled above"),
            };

            entries.push(RegistryEntry {
                node_id: node.id,
                label: node.label.clone(),
                kind,
            });
        }

        Ok(CompiledUnit {
            script: defs.join("\n\n"),
            entries,
            connections: sheet.connections.clone(),
        })
    }
}

fn function_name(node: &Node) -> String {
    let base = sanitize(&node.label);
    if base.is_empty() {
        format!("node_{}", node.id)
    } else {
        format!("node_{base}")
    }
}

/// Emits `# NODE_ID:<node_id>` ahead of the `def`: a purely human-readable
/// marker for `EmitScript`'s output (the runtime attributes a function
/// node's errors through its own call frame, not this comment; see
/// `SPEC_FULL.md` §4.1).
fn emit_function_def(node: &Node, starlark_name: &str) -> String {
    let body = node.data.code();
    let body = if body.trim().is_empty() { "pass" } else { body };
    let args = node.input_ports.join(", ");
    let indented_body: String = body
        .lines()
        .map(|line| format!("    {line}\n"))
        .collect();
    let return_stmt = if node.output_ports.is_empty() {
        "    return None".to_string()
    } else {
        let entries: Vec<String> = node
            .output_ports
            .iter()
            .map(|port| format!("\"{port}\": {port}"))
            .collect();
        format!("    return {{{}}}", entries.join(", "))
    };

    format!(
        "# NODE_ID:{}\ndef {starlark_name}({args}):\n{indented_body}{return_stmt}",
        node.id
    )
}

/// Replaces a function node's body with one that raises immediately, for a
/// node whose authored `code` failed `check_def_syntax`. Keeps the same
/// signature and `# NODE_ID:` marker so dispatch and `EmitScript` still see
/// a well-formed node; only the body changes, to a single `fail(...)` call
/// carrying the parse error for display on that node alone.
fn emit_function_parse_failure(node: &Node, starlark_name: &str, message: &str) -> String {
    let args = node.input_ports.join(", ");
    let reason = format!("Parse error in node '{}': {}", node.label, message);
    format!(
        "# NODE_ID:{}\ndef {starlark_name}({args}):\n    fail(\"{}\")",
        node.id,
        escape_starlark_string(&reason)
    )
}

fn escape_starlark_string(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn constant_kind(data: &NodeData) -> NodeKind {
    NodeKind::Constant {
        value: data.value().cloned().unwrap_or(serde_json::Value::Null),
        min: data.min(),
        max: data.max(),
        options: data.options(),
    }
}

fn input_kind(data: &NodeData) -> NodeKind {
    NodeKind::Input {
        default: data.value().cloned(),
        min: data.min(),
        max: data.max(),
        options: data.options(),
    }
}

fn lut_kind(node: &Node) -> NodeKind {
    let key_port = node.input_ports.first().cloned().unwrap_or_else(|| "key".to_string());
    NodeKind::Lut {
        rows: node.data.lut_rows(),
        key_port,
        output_ports: node.output_ports.clone(),
    }
}

fn nested_sheet_ref(node: &Node) -> Result<SheetRef, CodegenError> {
    let sheet_id = node.data.sheet_id().ok_or_else(|| CodegenError::MissingNestedSheet {
        node_label: node.label.clone(),
    })?;
    Ok(match node.data.version_id() {
        Some(version_id) => SheetRef::pinned(sheet_id, version_id),
        None => SheetRef::root(sheet_id),
    })
}

/// Maps this Sheet node's own input/output ports onto the nested sheet's
/// `input`/`output` nodes by matching port key to node label, falling back to
/// positional order when labels don't line up one-to-one (the same
/// root-vs-nested fallback rule `calc_service` uses for override resolution).
fn nested_port_maps(
    nested: &CompiledUnit,
    node: &Node,
) -> (Vec<(PortKey, sheet_model::NodeId)>, Vec<(PortKey, sheet_model::NodeId)>) {
    let nested_inputs: Vec<_> = nested
        .entries
        .iter()
        .filter(|e| matches!(e.kind, NodeKind::Input { .. }))
        .collect();
    // A sheet node's output port may read either a nested `output` node or a
    // nested `constant` node (constants are part of `public_outputs` too,
    // see `spec.md` §4.1/"Open Question" #2), so both are candidates here.
    let nested_outputs: Vec<_> = nested
        .entries
        .iter()
        .filter(|e| matches!(e.kind, NodeKind::Output | NodeKind::Constant { .. }))
        .collect();

    let input_map = node
        .input_ports
        .iter()
        .enumerate()
        .filter_map(|(i, port)| {
            let matched = nested_inputs
                .iter()
                .find(|e| &e.label == port)
                .or_else(|| nested_inputs.get(i));
            matched.map(|e| (port.clone(), e.node_id))
        })
        .collect();

    let output_map = node
        .output_ports
        .iter()
        .enumerate()
        .filter_map(|(i, port)| {
            let matched = nested_outputs
                .iter()
                .find(|e| &e.label == port)
                .or_else(|| nested_outputs.get(i));
            matched.map(|e| (port.clone(), e.node_id))
        })
        .collect();

    (input_map, output_map)
}
