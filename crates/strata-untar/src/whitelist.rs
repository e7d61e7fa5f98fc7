use std::path::{Component, Path};

use crate::entry::EntryKind;

/// Optional allow-list of absolute archive paths.
///
/// Rules are either exact paths (`/etc/file`) or directory prefixes ending in a
/// separator (`/etc/dir/`). An empty whitelist allows everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathWhitelist {
    rules: Vec<String>,
}

impl PathWhitelist {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, rule: impl Into<String>) {
        self.rules.push(rule.into());
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn allows(&self, path: &Path, kind: EntryKind) -> bool {
        if self.rules.is_empty() {
            return true;
        }

        let name = normalize(path);
        self.rules.iter().any(|rule| {
            // Whitelist: "/foo"  File: "/foo"
            if *rule == name {
                return true;
            }
            if !rule.ends_with('/') {
                return false;
            }
            // Whitelist: "/usr/bin/"  Dir: "/usr/bin"
            if kind == EntryKind::Directory
                && rule.len() == name.len() + 1
                && rule.starts_with(&name)
            {
                return true;
            }
            // Whitelist: "/usr/bin/"  File: "/usr/bin/bash"
            name.starts_with(rule.as_str())
        })
    }
}

/// Clean absolute form of an archive path: `./usr/bin/` becomes `/usr/bin`.
fn normalize(path: &Path) -> String {
    let mut name = String::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            name.push('/');
            name.push_str(&part.to_string_lossy());
        }
    }
    if name.is_empty() {
        name.push('/');
    }
    name
}
