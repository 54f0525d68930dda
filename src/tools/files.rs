//! Local file tools: read a file, list a directory.
//!
//! `read_file` extracts text from `.pdf` and `.docx` documents and reads
//! everything else as UTF-8 (lossy).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use walkdir::WalkDir;

use super::Tool;

const MAX_READ_CHARS: usize = 100_000;

fn resolve(workspace: &Path, path: &str) -> PathBuf {
    // Absolute paths replace the workspace on join
    workspace.join(path)
}

/// Read a text file or document.
pub struct ReadFile {
    workspace: PathBuf,
}

impl ReadFile {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a local file and return its text. Supports plain text files (.txt, .md, .py, .json, .csv, ...) plus .pdf and .docx documents. Relative paths resolve against the workspace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let file_path = args["file_path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'file_path' argument"))?;
        let full_path = resolve(&self.workspace, file_path);

        if !full_path.is_file() {
            return Err(anyhow::anyhow!("File not found: {}", file_path));
        }

        let bytes = tokio::fs::read(&full_path)
            .await
            .map_err(|e| anyhow::anyhow!("Error reading {}: {}", file_path, e))?;

        // Document parsing is CPU-bound
        let text = tokio::task::spawn_blocking(move || extract_text(&full_path, &bytes)).await??;

        Ok(super::truncate_chars(
            &text,
            MAX_READ_CHARS,
            "\n... [file truncated]",
        ))
    }
}

fn extract_text(path: &Path, bytes: &[u8]) -> anyhow::Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => pdf_text(bytes),
        Some("docx") => docx_text(bytes),
        _ => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn pdf_text(bytes: &[u8]) -> anyhow::Result<String> {
    // pdf-extract panics on some malformed fonts
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(anyhow::anyhow!("Could not extract text from PDF: {}", e)),
        Err(_) => {
            tracing::warn!("PDF extraction panicked");
            Err(anyhow::anyhow!(
                "Could not extract text from PDF: the document is malformed"
            ))
        }
    }
}

fn docx_text(bytes: &[u8]) -> anyhow::Result<String> {
    let doc = docx_rs::read_docx(bytes)
        .map_err(|e| anyhow::anyhow!("Could not parse DOCX: {}", e))?;

    let mut lines = Vec::new();
    for child in &doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => lines.push(paragraph_text(para)),
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(tr) = row;
                    let cells: Vec<String> = tr
                        .cells
                        .iter()
                        .map(|cell| {
                            let docx_rs::TableRowChild::TableCell(tc) = cell;
                            tc.children
                                .iter()
                                .filter_map(|c| match c {
                                    docx_rs::TableCellContent::Paragraph(p) => {
                                        Some(paragraph_text(p))
                                    }
                                    _ => None,
                                })
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .collect();
                    lines.push(cells.join(" | "));
                }
            }
            _ => {}
        }
    }

    Ok(lines.join("\n").trim().to_string())
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut out = String::new();
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run_text(run, &mut out),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        push_run_text(run, &mut out);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn push_run_text(run: &docx_rs::Run, out: &mut String) {
    for child in &run.children {
        if let docx_rs::RunChild::Text(text) = child {
            out.push_str(&text.text);
        }
    }
}

/// List a directory's entries.
pub struct ListFiles {
    workspace: PathBuf,
}

impl ListFiles {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and folders in a directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Path to the directory. Defaults to the workspace root."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let directory = args["directory"].as_str().unwrap_or(".");
        let full_path = resolve(&self.workspace, directory);

        if !full_path.is_dir() {
            return Err(anyhow::anyhow!("Not a directory: {}", directory));
        }

        // Directory walks block; keep them off the runtime threads
        tokio::task::spawn_blocking(move || list_dir(&full_path)).await?
    }
}

fn list_dir(dir: &Path) -> anyhow::Result<String> {
    let mut lines = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            lines.push(format!("  [DIR]  {}/", name));
        } else {
            let size = entry.metadata()?.len();
            lines.push(format!("  [FILE] {} ({} bytes)", name, group_thousands(size)));
        }
    }

    if lines.is_empty() {
        Ok("Directory is empty.".to_string())
    } else {
        Ok(lines.join("\n"))
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
