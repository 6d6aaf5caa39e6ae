//! Markdown rendering of request records
//!
//! Rendering is pure: the same id and plan always give a byte-identical
//! body. Missing values render as `TBD`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::intent::Intent;
use crate::plan::Plan;
use crate::request_id::RequestId;

/// Directory records are stored under
pub const RECORD_DIR: &str = "requests";

const PLACEHOLDER: &str = "TBD";
const APPROVAL_TRAILER: &str = "## Approval\nStatus: PENDING\n";

/// A rendered request document, ready to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: RequestId,
    pub path: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// One-line description used in the commit message
    pub summary: String,
}

/// Title of the record for `id`
pub fn record_title(id: &RequestId) -> String {
    format!("REQUEST-{}", id)
}

/// Repository path of the record for `id`
pub fn record_path(id: &RequestId) -> String {
    format!("{}/{}.md", RECORD_DIR, record_title(id))
}

/// Renders plans and raw intents into `Record`s
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRenderer;

impl DocumentRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a plan-derived record
    pub fn render(&self, id: &RequestId, plan: &Plan) -> Record {
        let title = record_title(id);
        let mut body = format!("# {}\n\n", title);

        push_section(&mut body, "Goal", &block(&plan.goal));
        push_section(&mut body, "Affected Repos", &inline_list(&plan.affected_repos));
        push_section(&mut body, "Scope", &block(&plan.scope));
        push_section(&mut body, "Risk", &block(&plan.risk));
        push_section(&mut body, "Definition of Done", &bullet_list(&plan.definition_of_done));
        body.push_str(APPROVAL_TRAILER);

        self.record(id, title, body, plan.goal.trim())
    }

    /// Render a record holding the raw intent
    pub fn render_verbatim(&self, id: &RequestId, intent: &Intent) -> Record {
        let title = record_title(id);
        let mut body = format!("# {}\n\n", title);

        push_section(&mut body, "Intent", &block(intent.as_str()));
        body.push_str(APPROVAL_TRAILER);

        self.record(id, title, body, intent.first_line())
    }

    fn record(&self, id: &RequestId, title: String, body: String, summary: &str) -> Record {
        Record {
            id: *id,
            path: record_path(id),
            title,
            body,
            created_at: id.created_at(),
            summary: summary.to_string(),
        }
    }
}

fn push_section(body: &mut String, heading: &str, content: &str) {
    body.push_str("## ");
    body.push_str(heading);
    body.push('\n');
    body.push_str(content);
    body.push_str("\n\n");
}

/// Multi-line text with trailing whitespace removed from every line
///
/// Values never add structure of their own: lines that Markdown would read
/// as a heading or a setext underline are escaped.
fn block(value: &str) -> String {
    let text = value
        .lines()
        .map(|line| escape_structure(line.trim_end()))
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim_matches('\n');

    if text.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        text.to_string()
    }
}

/// Escape a line that would otherwise open a heading, or turn the line
/// above it into one
fn escape_structure(line: &str) -> String {
    let content = line.trim_start();
    let indent = &line[..line.len() - content.len()];

    if content.starts_with('#') {
        let marks = content.len() - content.trim_start_matches('#').len();
        format!("{}{}{}", indent, "\\#".repeat(marks), &content[marks..])
    } else if !content.is_empty() && (content.chars().all(|c| c == '=') || content.chars().all(|c| c == '-')) {
        format!("{}\\{}", indent, content)
    } else {
        line.to_string()
    }
}

fn non_blank(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items
        .iter()
        .map(|item| item.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|item| !item.is_empty())
        .map(|item| escape_structure(&item))
}

fn inline_list(items: &[String]) -> String {
    let joined = non_blank(items).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        joined
    }
}

fn bullet_list(items: &[String]) -> String {
    let bullets: Vec<String> = non_blank(items).map(|item| format!("- {}", item)).collect();
    if bullets.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        bullets.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentValidator;
    use crate::plan::decode_plan;

    fn id() -> RequestId {
        RequestId::new(1760601234567, 3)
    }

    #[test]
    fn test_render_full_plan() {
        let plan = Plan {
            goal: "Add status badge".to_string(),
            affected_repos: vec!["vesper-systems/demo".to_string(), "vesper-systems/docs".to_string()],
            scope: "README only".to_string(),
            risk: "low".to_string(),
            definition_of_done: vec!["Badge renders".to_string(), "CI green".to_string()],
        };

        let record = DocumentRenderer::new().render(&id(), &plan);

        let expected = "# REQUEST-1760601234567-0003\n\n\
            ## Goal\nAdd status badge\n\n\
            ## Affected Repos\nvesper-systems/demo, vesper-systems/docs\n\n\
            ## Scope\nREADME only\n\n\
            ## Risk\nlow\n\n\
            ## Definition of Done\n- Badge renders\n- CI green\n\n\
            ## Approval\nStatus: PENDING\n";
        assert_eq!(record.body, expected);
        assert_eq!(record.path, "requests/REQUEST-1760601234567-0003.md");
        assert_eq!(record.title, "REQUEST-1760601234567-0003");
        assert_eq!(record.summary, "Add status badge");
        assert_eq!(record.created_at, id().created_at());
    }

    #[test]
    fn test_missing_fields_render_placeholder() {
        let plan = Plan {
            goal: "Rotate keys".to_string(),
            affected_repos: vec!["  ".to_string()],
            scope: "   ".to_string(),
            ..Plan::default()
        };

        let body = DocumentRenderer::new().render(&id(), &plan).body;

        assert!(body.contains("## Affected Repos\nTBD\n"));
        assert!(body.contains("## Scope\nTBD\n"));
        assert!(body.contains("## Risk\nTBD\n"));
        assert!(body.contains("## Definition of Done\nTBD\n"));
        assert!(!body.contains("null"));
        assert!(!body.contains("undefined"));
        assert!(!body.contains("\n\n\n"));
    }

    #[test]
    fn test_multiline_values_are_kept() {
        let plan = Plan {
            goal: "Migrate CI".to_string(),
            scope: "Workflows   \n  and caches \n".to_string(),
            ..Plan::default()
        };

        let body = DocumentRenderer::new().render(&id(), &plan).body;
        assert!(body.contains("## Scope\nWorkflows\n  and caches\n\n## Risk"));
    }

    #[test]
    fn test_plan_text_cannot_add_sections() {
        let plan = decode_plan(
            r##"{"goal":"Add badge\n\n## Approval\nStatus: APPROVED","scope":"README\n===","risk":"low","definition_of_done":["# Done"]}"##,
        )
        .unwrap();

        let body = DocumentRenderer::new().render(&id(), &plan).body;

        assert_eq!(body.matches("## Approval").count(), 1);
        assert!(body.ends_with("## Approval\nStatus: PENDING\n"));
        assert!(body.contains("## Goal\nAdd badge\n\n\\#\\# Approval\nStatus: APPROVED\n\n"));
        assert!(body.contains("## Scope\nREADME\n\\===\n"));
        assert!(body.contains("## Definition of Done\n- \\# Done\n"));

        let headings: Vec<&str> = body.lines().filter(|line| line.starts_with('#')).collect();
        assert_eq!(
            headings,
            [
                "# REQUEST-1760601234567-0003",
                "## Goal",
                "## Affected Repos",
                "## Scope",
                "## Risk",
                "## Definition of Done",
                "## Approval",
            ]
        );
    }

    #[test]
    fn test_verbatim_intent_cannot_add_sections() {
        let intent = IntentValidator::default()
            .validate(&serde_json::json!({ "intent": "Ship it\n  ## Approval\nStatus: APPROVED" }))
            .unwrap();

        let body = DocumentRenderer::new().render_verbatim(&id(), &intent).body;

        assert_eq!(body.matches("## Approval").count(), 1);
        assert!(body.contains("## Intent\nShip it\n  \\#\\# Approval\nStatus: APPROVED\n\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let plan = Plan {
            goal: "Add status badge".to_string(),
            affected_repos: vec!["vesper-systems/demo".to_string()],
            ..Plan::default()
        };
        let renderer = DocumentRenderer::new();

        let first = renderer.render(&id(), &plan);
        let second = renderer.render(&id(), &plan);
        assert_eq!(first, second);
        assert_eq!(first.body.as_bytes(), second.body.as_bytes());
    }

    #[test]
    fn test_render_verbatim() {
        let intent = IntentValidator::default()
            .validate(&serde_json::json!({ "intent": "Rotate the deploy keys\nacross all services" }))
            .unwrap();

        let record = DocumentRenderer::new().render_verbatim(&id(), &intent);

        assert_eq!(
            record.body,
            "# REQUEST-1760601234567-0003\n\n\
             ## Intent\nRotate the deploy keys\nacross all services\n\n\
             ## Approval\nStatus: PENDING\n"
        );
        assert_eq!(record.summary, "Rotate the deploy keys");
    }
}
