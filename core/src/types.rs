use serde::{Deserialize, Serialize};
use std::fmt;

/// Software tag used when a record does not name one
pub const DEFAULT_SOFTWARE: &str = "General";

/// Selects how a stored command is dispatched
///
/// Serialized with the exact labels the store file has always used. Labels
/// outside the known set are kept verbatim in `Other` so that rewriting the
/// file never loses them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Hotkey,
    Cmd,
    PowerShell,
    RunPanel,
    #[default]
    Snippet,
    Workflow,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Hotkey => "Hotkey",
            Category::Cmd => "CMD",
            Category::PowerShell => "PowerShell",
            Category::RunPanel => "Run Panel",
            Category::Snippet => "Snippet",
            Category::Workflow => "Workflow",
            Category::Other(label) => label,
        }
    }

    /// Categories that launch a shell line and honour placeholders
    pub fn is_shell(&self) -> bool {
        matches!(
            self,
            Category::Cmd | Category::PowerShell | Category::RunPanel | Category::Workflow
        )
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Hotkey" => Category::Hotkey,
            "CMD" => Category::Cmd,
            "PowerShell" => Category::PowerShell,
            "Run Panel" => Category::RunPanel,
            "Snippet" => Category::Snippet,
            "Workflow" => Category::Workflow,
            _ => Category::Other(label),
        }
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Category::from(label.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_software() -> String {
    DEFAULT_SOFTWARE.to_string()
}

/// A stored command record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Literal payload: hotkey spec, shell line, or workflow string
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_software")]
    pub software: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Command {
    pub fn new(command: impl Into<String>, category: Category) -> Self {
        Self {
            command: command.into(),
            description: String::new(),
            software: default_software(),
            category,
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_software(mut self, software: impl Into<String>) -> Self {
        self.software = software.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Deduplication key for this record
    pub fn identity(&self) -> CommandIdentity {
        CommandIdentity::new(&self.software, &self.command)
    }

    /// True when the payload is blank and the record must not be persisted
    pub fn is_blank(&self) -> bool {
        self.command.trim().is_empty()
    }

    /// Lowercased text that search and tagging scan
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.command,
            self.description,
            self.software,
            self.tags.join(" ")
        )
        .to_lowercase()
    }
}

/// Case-insensitive `(software, command)` pair used to detect duplicates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandIdentity {
    software: String,
    command: String,
}

impl CommandIdentity {
    pub fn new(software: &str, command: &str) -> Self {
        Self {
            software: software.to_lowercase(),
            command: command.trim().to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip_through_json() {
        let json = r#"["Hotkey","CMD","PowerShell","Run Panel","Snippet","Workflow","Macro"]"#;
        let categories: Vec<Category> = serde_json::from_str(json).unwrap();

        assert_eq!(categories[1], Category::Cmd);
        assert_eq!(categories[3], Category::RunPanel);
        assert_eq!(categories[6], Category::Other("Macro".to_string()));
        assert_eq!(serde_json::to_string(&categories).unwrap(), json);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let cmd: Command = serde_json::from_str(r#"{"command": "ctrl+c"}"#).unwrap();

        assert_eq!(cmd.software, "General");
        assert_eq!(cmd.category, Category::Snippet);
        assert!(cmd.description.is_empty());
        assert!(cmd.tags.is_empty());
    }

    #[test]
    fn test_identity_ignores_case_and_command_padding() {
        let a = Command::new("  Git Status ", Category::Cmd).with_software("Git");
        let b = Command::new("git status", Category::Cmd).with_software("GIT");
        let c = Command::new("git status", Category::Cmd).with_software("Terminal");

        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }

    #[test]
    fn test_blank_command_detection() {
        assert!(Command::new("   ", Category::Snippet).is_blank());
        assert!(!Command::new("x", Category::Snippet).is_blank());
    }
}
