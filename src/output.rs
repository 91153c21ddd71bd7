use std::io::{self, Write};

use serde::Serialize;

use crate::browser::{MetadataPushReport, RemoteMetadata};
use crate::domain::{ObjectKind, RemoteObject};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub kind: ObjectKind,
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(object: &RemoteObject) -> Self {
        Self {
            kind: object.kind(),
            id: object.id(),
            name: object.name().to_string(),
            owner: object.owner().display_name.clone(),
            group: object.group().display_name.clone(),
            child_count: object.child_count(),
            children: Vec::new(),
        }
    }

    pub fn write_text<W: Write>(&self, out: &mut W, depth: usize) -> io::Result<()> {
        writeln!(
            out,
            "{:indent$}{} {} [{}] ({})",
            "",
            self.kind,
            self.name,
            self.id,
            self.owner,
            indent = depth * 2
        )?;
        for child in &self.children {
            child.write_text(out, depth + 1)?;
        }
        Ok(())
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_tree(tree: &TreeNode) -> io::Result<()> {
        Self::print_json(tree)
    }

    pub fn print_metadata(metadata: &RemoteMetadata) -> io::Result<()> {
        Self::print_json(metadata)
    }

    pub fn print_push(report: &MetadataPushReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
