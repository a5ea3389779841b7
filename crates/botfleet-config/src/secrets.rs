//! Typed view of a `KEY=VALUE` secrets file
//!
//! Lines that are not entries (comments, blanks, anything unparseable) are
//! kept verbatim, so `SecretsFile::parse(text).to_string() == text` for any
//! input. Named blocks are a `# <Name>` header followed by contiguous
//! entries for the block's own keys, separated from the preceding content
//! by one blank line. An entry for any other key ends the block.

use std::fmt;

/// Keys the reconciler manages
pub mod env_keys {
    pub const GATEWAY_TOKEN: &str = "OPENCLAW_GATEWAY_TOKEN";
    pub const DEV_PORT_START: &str = "BOTFLEET_DEV_PORT_START";
    pub const DEV_PORT_END: &str = "BOTFLEET_DEV_PORT_END";
    pub const PROXY_TARGET: &str = "BOTFLEET_PROXY_TARGET";
    pub const TS_AUTHKEY: &str = "TS_AUTHKEY";
    pub const TS_HOSTNAME: &str = "TS_HOSTNAME";

    /// Block header for the Tailscale entries
    pub const TAILSCALE_BLOCK: &str = "Tailscale";

    /// Named blocks and the keys that belong to them
    pub const BLOCKS: &[(&str, &[&str])] = &[(TAILSCALE_BLOCK, &[TS_AUTHKEY, TS_HOSTNAME])];
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { key: String, value: String },
    Raw(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((key, value)) if is_key(key) => Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
            },
            _ => Line::Raw(raw.to_string()),
        }
    }

    fn key(&self) -> Option<&str> {
        match self {
            Line::Entry { key, .. } => Some(key),
            Line::Raw(_) => None,
        }
    }
}

fn is_key(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn header(name: &str) -> String {
    format!("# {}", name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    name: String,
    keys: Vec<String>,
}

/// Ordered secrets file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsFile {
    lines: Vec<Line>,
    trailing_newline: bool,
    blocks: Vec<Block>,
}

impl Default for SecretsFile {
    fn default() -> Self {
        Self::parse("")
    }
}

impl SecretsFile {
    /// Parse `text`; the blocks in [`env_keys::BLOCKS`] are known up front.
    pub fn parse(text: &str) -> Self {
        let (lines, trailing_newline) = if text.is_empty() {
            (Vec::new(), true)
        } else {
            let body = text.strip_suffix('\n').unwrap_or(text);
            (body.split('\n').map(Line::parse).collect(), text.ends_with('\n'))
        };

        let mut file = Self {
            lines,
            trailing_newline,
            blocks: Vec::new(),
        };
        for (name, keys) in env_keys::BLOCKS {
            file.declare_block(name, keys.iter().copied());
        }
        file
    }

    /// Record which keys belong to the block `name`
    pub fn with_block(mut self, name: &str, keys: &[&str]) -> Self {
        self.declare_block(name, keys.iter().copied());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replace the value in place, or add a new entry at the end of the
    /// loose entries (before any named blocks that close the file).
    pub fn set(&mut self, key: &str, value: &str) {
        if !self.replace_value(key, value) {
            let at = self.loose_end();
            self.lines.insert(
                at,
                Line::Entry {
                    key: key.to_string(),
                    value: value.to_string(),
                },
            );
        }
    }

    /// Replace the value only if the key is already present.
    pub fn set_existing(&mut self, key: &str, value: &str) -> bool {
        self.replace_value(key, value)
    }

    /// Drop every line for `key`. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.key() != Some(key));
        self.lines.len() != before
    }

    pub fn has_block(&self, name: &str) -> bool {
        self.block_header(name).is_some()
    }

    /// Insert the block if absent; otherwise update its entries in place.
    pub fn set_block(&mut self, name: &str, entries: &[(&str, &str)]) {
        self.declare_block(name, entries.iter().map(|(key, _)| *key));
        match self.block_header(name) {
            Some(start) => {
                let mut end = self.block_end(name, start);
                for (key, value) in entries {
                    if self.replace_value(key, value) {
                        continue;
                    }
                    self.lines.insert(
                        end,
                        Line::Entry {
                            key: key.to_string(),
                            value: value.to_string(),
                        },
                    );
                    end += 1;
                }
            }
            None => {
                // Loose copies of the block's keys would shadow the block.
                for (key, _) in entries {
                    self.remove(key);
                }
                self.lines.push(Line::Raw(String::new()));
                self.lines.push(Line::Raw(header(name)));
                self.lines.extend(entries.iter().map(|(key, value)| Line::Entry {
                    key: key.to_string(),
                    value: value.to_string(),
                }));
            }
        }
    }

    /// Remove the header, the block's own entries that follow it and the
    /// blank line before it. Returns whether the block was present.
    pub fn remove_block(&mut self, name: &str) -> bool {
        let Some((start, end)) = self.block_region(name) else {
            return false;
        };
        self.lines.drain(start..end);
        true
    }

    fn replace_value(&mut self, key: &str, value: &str) -> bool {
        for line in &mut self.lines {
            if let Line::Entry { key: k, value: v } = line {
                if k == key {
                    *v = value.to_string();
                    return true;
                }
            }
        }
        false
    }

    fn block_header(&self, name: &str) -> Option<usize> {
        let header = header(name);
        self.lines
            .iter()
            .position(|line| matches!(line, Line::Raw(raw) if *raw == header))
    }

    fn declare_block<'a>(&mut self, name: &str, keys: impl IntoIterator<Item = &'a str>) {
        let index = match self.blocks.iter().position(|b| b.name == name) {
            Some(index) => index,
            None => {
                self.blocks.push(Block {
                    name: name.to_string(),
                    keys: Vec::new(),
                });
                self.blocks.len() - 1
            }
        };
        let block = &mut self.blocks[index];
        for key in keys {
            if !block.keys.iter().any(|k| k == key) {
                block.keys.push(key.to_string());
            }
        }
    }

    /// Index one past the last entry of block `name` following its header
    /// at `start`
    fn block_end(&self, name: &str, start: usize) -> usize {
        let keys: &[String] = self
            .blocks
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.keys.as_slice())
            .unwrap_or_default();
        let mut end = start + 1;
        while end < self.lines.len()
            && self.lines[end]
                .key()
                .is_some_and(|key| keys.iter().any(|k| k == key))
        {
            end += 1;
        }
        end
    }

    /// `start..end` of block `name`, including the blank line before it
    fn block_region(&self, name: &str) -> Option<(usize, usize)> {
        let header = self.block_header(name)?;
        let end = self.block_end(name, header);
        let start = if header > 0 && self.lines[header - 1] == Line::Raw(String::new()) {
            header - 1
        } else {
            header
        };
        Some((start, end))
    }

    /// Insertion point for new loose entries: the end of the file, moved
    /// back over any named blocks that run to the end.
    fn loose_end(&self) -> usize {
        let mut at = self.lines.len();
        while let Some(start) = self
            .blocks
            .iter()
            .filter_map(|b| self.block_region(&b.name))
            .find(|(start, end)| *end == at && *start < at)
            .map(|(start, _)| start)
        {
            at = start;
        }
        at
    }
}

impl fmt::Display for SecretsFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            match line {
                Line::Entry { key, value } => write!(f, "{}={}", key, value)?,
                Line::Raw(raw) => f.write_str(raw)?,
            }
        }
        if !self.lines.is_empty() && self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}
