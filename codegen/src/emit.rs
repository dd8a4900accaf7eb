use std::collections::HashSet;

use sheet_model::{GraphRepository, Node, NodeVariant, Sheet, SheetRef};

use crate::error::CodegenError;
use crate::identifier::{sanitize, NameTable};

/// Produces the human-readable script for a sheet tree, for the `EmitScript`
/// operation (`spec.md` §4.4). Every node, not only `function` nodes, gets a
/// `# NODE_ID:<node_id>` marker so a reader can correlate any block back to
/// the sheet that produced it; the runtime itself never parses these
/// markers back out (see `CompiledUnit`'s own dispatch in `sandbox_runtime`).
pub struct Emitter<'a> {
    repository: &'a dyn GraphRepository,
    visited: HashSet<SheetRef>,
}

impl<'a> Emitter<'a> {
    pub fn new(repository: &'a dyn GraphRepository) -> Self {
        Self {
            repository,
            visited: HashSet::new(),
        }
    }

    pub async fn emit(&mut self, sheet_ref: SheetRef) -> Result<String, CodegenError> {
        let mut out = String::new();
        self.emit_into(sheet_ref, &mut out).await?;
        Ok(out)
    }

    fn emit_into<'b>(
        &'b mut self,
        sheet_ref: SheetRef,
        out: &'b mut String,
    ) -> futures::future::BoxFuture<'b, Result<(), CodegenError>> {
        Box::pin(async move {
            if !self.visited.insert(sheet_ref) {
                out.push_str(&format!("# (sheet {sheet_ref} already emitted above)\n\n"));
                return Ok(());
            }

            let sheet = match sheet_ref.version_id {
                Some(version_id) => self.repository.fetch_version(version_id).await?,
                None => self.repository.fetch_sheet(sheet_ref.sheet_id).await?,
            };

            out.push_str(&format!("# --- Sheet: {} ({sheet_ref}) ---\n", sheet.name));

            let mut names = NameTable::new();
            for node in &sheet.nodes {
                self.emit_node(&sheet, node, &mut names, out).await?;
            }
            out.push('\n');
            Ok(())
        })
    }

    async fn emit_node(
        &mut self,
        sheet: &Sheet,
        node: &Node,
        names: &mut NameTable,
        out: &mut String,
    ) -> Result<(), CodegenError> {
        if node.is_comment() {
            out.push_str(&format!("# NODE_ID:{}\n# note: {}\n\n", node.id, node.label));
            return Ok(());
        }

        out.push_str(&format!("# NODE_ID:{}\n", node.id));

        match node.variant {
            NodeVariant::Function => {
                let name = names.claim(&sanitize(&node.label));
                let args = node.input_ports.join(", ");
                out.push_str(&format!("def node_{name}({args}):\n"));
                let body = node.data.code();
                let body = if body.trim().is_empty() { "pass" } else { body };
                for line in body.lines() {
                    out.push_str(&format!("    {line}\n"));
                }
                out.push('\n');
            }
            NodeVariant::Constant => {
                out.push_str(&format!(
                    "constant {} = {}\n\n",
                    node.label,
                    node.data.value().cloned().unwrap_or(serde_json::Value::Null)
                ));
            }
            NodeVariant::Input => {
                out.push_str(&format!(
                    "input {} (default {})\n\n",
                    node.label,
                    node.data.value().cloned().unwrap_or(serde_json::Value::Null)
                ));
            }
            NodeVariant::Output => {
                out.push_str(&format!("output {}\n\n", node.label));
            }
            NodeVariant::Lut => {
                out.push_str(&format!(
                    "lookup_table {} ({} rows)\n\n",
                    node.label,
                    node.data.lut_rows().len()
                ));
            }
            NodeVariant::Sheet => {
                out.push_str(&format!("sheet {} {{\n", node.label));
                if let Some(sheet_id) = node.data.sheet_id() {
                    let nested_ref = match node.data.version_id() {
                        Some(version_id) => SheetRef::pinned(sheet_id, version_id),
                        None => SheetRef::root(sheet_id),
                    };
                    self.emit_into(nested_ref, out).await?;
                }
                out.push_str("}\n\n");
            }
            NodeVariant::Comment => unreachable!("handled above"),
        }

        let _ = sheet;
        Ok(())
    }
}

pub async fn emit_script(
    repository: &dyn GraphRepository,
    sheet_ref: SheetRef,
) -> Result<String, CodegenError> {
    Emitter::new(repository).emit(sheet_ref).await
}
