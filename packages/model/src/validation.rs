//! Field-level validation rules.
//!
//! Validation failures block save, never local editing: a panel may hold an
//! invalid value in the store while the user is mid-edit, but the save
//! coordinator refuses to persist it.

use crate::{Entity, Page, PageVersion, Theme, Widget};

/// One recoverable field problem, surfaced next to the offending input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn required(field: &'static str) -> Self {
        Self {
            field,
            message: "is required".to_string(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Check an entity against its kind's field constraints.
pub fn validate(entity: &Entity) -> Vec<ValidationIssue> {
    match entity {
        Entity::Page(page) => validate_page(page),
        Entity::Version(version) => validate_version(version),
        Entity::Theme(theme) => validate_theme(theme),
        Entity::Widget(widget) => validate_widget(widget),
    }
}

fn validate_page(page: &Page) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if page.title.trim().is_empty() {
        issues.push(ValidationIssue::required("title"));
    }
    if page.slug.is_empty() {
        issues.push(ValidationIssue::required("slug"));
    } else if !is_slug(&page.slug) {
        issues.push(ValidationIssue {
            field: "slug",
            message: "may only contain lowercase letters, digits and hyphens".to_string(),
        });
    }
    issues
}

fn validate_version(version: &PageVersion) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if version.name.trim().is_empty() {
        issues.push(ValidationIssue::required("name"));
    }
    issues
}

fn validate_theme(theme: &Theme) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if theme.name.trim().is_empty() {
        issues.push(ValidationIssue::required("name"));
    }
    issues
}

fn validate_widget(widget: &Widget) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if widget.widget_type.trim().is_empty() {
        issues.push(ValidationIssue::required("widget_type"));
    }
    issues
}

fn is_slug(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
