//! In-memory form used by the unit tests. It mimics the Google Forms markup
//! closely enough for the locators and records every interaction.

use super::{FormNode, FormPage, Role};
use crate::error::FillError;
use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Click { node: usize, name: String },
    Scroll(usize),
    Idle,
    Pause(Duration),
    Screenshot(PathBuf),
}

#[derive(Debug, Default)]
struct NodeData {
    role: Option<Role>,
    text: String,
    attrs: BTreeMap<String, String>,
    children: Vec<usize>,
    parent: Option<usize>,
    stuck: bool,
}

pub struct MockPage {
    nodes: RefCell<Vec<NodeData>>,
    events: RefCell<Vec<Event>>,
    idle: Cell<bool>,
}

pub struct MockNode<'a> {
    page: &'a MockPage,
    id: usize,
}

const ROOT: usize = 0;

impl MockPage {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![NodeData::default()]),
            events: RefCell::new(Vec::new()),
            idle: Cell::new(true),
        }
    }

    // --- building ---

    pub fn push(&self, parent: usize, role: Option<Role>, text: &str, attrs: &[(&str, &str)]) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.len();
        nodes.push(NodeData {
            role,
            text: text.to_string(),
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            children: Vec::new(),
            parent: Some(parent),
            stuck: false,
        });
        nodes[parent].children.push(id);
        id
    }

    fn add_item(&self, title: &str) -> usize {
        let item = self.push(ROOT, Some(Role::ListItem), "", &[]);
        self.push(item, None, title, &[("role", "heading")]);
        item
    }

    fn add_choice_question(&self, title: &str, options: &[&str], role: Role) -> usize {
        let item = self.add_item(title);
        for option in options {
            let control = self.push(
                item,
                Some(role),
                "",
                &[("aria-label", *option), ("data-value", *option), ("aria-checked", "false")],
            );
            self.push(control, None, option, &[]);
        }
        item
    }

    pub fn add_single_select(&self, title: &str, options: &[&str]) -> usize {
        self.add_choice_question(title, options, Role::Radio)
    }

    pub fn add_multi_select(&self, title: &str, options: &[&str]) -> usize {
        self.add_choice_question(title, options, Role::Checkbox)
    }

    /// Unnamed checkboxes, each wrapped together with a sibling label span.
    pub fn add_multi_select_with_side_labels(&self, title: &str, options: &[&str]) -> usize {
        let item = self.add_item(title);
        for option in options {
            let wrapper = self.push(item, None, "", &[]);
            self.push(wrapper, Some(Role::Checkbox), "", &[("aria-checked", "false")]);
            self.push(wrapper, None, option, &[]);
        }
        item
    }

    /// Options rendered as plain text, without radio/checkbox roles.
    pub fn add_question_without_roles(&self, title: &str, options: &[&str]) -> usize {
        let item = self.add_item(title);
        for option in options {
            let wrapper = self.push(item, None, "", &[]);
            self.push(wrapper, None, option, &[]);
        }
        item
    }

    pub fn add_text(&self, parent: usize, text: &str) -> usize {
        self.push(parent, None, text, &[])
    }

    pub fn add_matrix(&self, title: &str, rows: &[&str], cols: usize) -> usize {
        self.add_grid(title, rows, cols, Some(Role::RadioGroup))
    }

    /// Rows are plain containers instead of radiogroups.
    pub fn add_matrix_without_groups(&self, title: &str, rows: &[&str], cols: usize) -> usize {
        self.add_grid(title, rows, cols, None)
    }

    fn add_grid(&self, title: &str, rows: &[&str], cols: usize, row_role: Option<Role>) -> usize {
        let item = self.add_item(title);
        let body = self.push(item, None, "", &[]);
        for row in rows {
            let row_node = self.push(body, row_role, "", &[("aria-label", *row)]);
            self.push(row_node, None, row, &[]);
            for col in 0..cols {
                let name = format!("{}, columna {}", row, col + 1);
                self.push(row_node, Some(Role::Radio), "", &[("aria-label", name.as_str()), ("aria-checked", "false")]);
            }
        }
        item
    }

    pub fn add_button(&self, label: &str) -> usize {
        self.push(ROOT, Some(Role::Button), label, &[])
    }

    pub fn set_stuck(&self, node: usize) {
        self.nodes.borrow_mut()[node].stuck = true;
    }

    pub fn set_idle(&self, idle: bool) {
        self.idle.set(idle);
    }

    pub fn set_checked(&self, node: usize, checked: bool) {
        self.nodes.borrow_mut()[node]
            .attrs
            .insert("aria-checked".to_string(), checked.to_string());
    }

    // --- inspection ---

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Accessible names of clicked nodes, in click order.
    pub fn clicks(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Click { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clicks_within(&self, ancestor: usize) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Click { node, .. } if self.is_within(*node, ancestor)))
            .count()
    }

    pub fn count_events(&self, wanted: fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| wanted(e)).count()
    }

    pub fn checked_labels(&self, item: usize) -> Vec<String> {
        let nodes = self.nodes.borrow();
        self.descendant_ids(item)
            .into_iter()
            .filter(|id| nodes[*id].attrs.get("aria-checked").map(String::as_str) == Some("true"))
            .filter_map(|id| nodes[id].attrs.get("aria-label").cloned())
            .collect()
    }

    /// Checked column per matrix row, in row order.
    pub fn matrix_selection(&self, item: usize) -> Vec<Option<usize>> {
        let nodes = self.nodes.borrow();
        let mut rows = Vec::new();
        for id in self.descendant_ids(item) {
            let radios: Vec<usize> = nodes[id]
                .children
                .iter()
                .copied()
                .filter(|c| nodes[*c].role == Some(Role::Radio))
                .collect();
            if radios.is_empty() {
                continue;
            }
            rows.push(
                radios
                    .iter()
                    .position(|r| nodes[*r].attrs.get("aria-checked").map(String::as_str) == Some("true")),
            );
        }
        rows
    }

    // --- tree helpers ---

    fn is_within(&self, node: usize, ancestor: usize) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes[id].parent;
        }
        false
    }

    fn descendant_ids(&self, id: usize) -> Vec<usize> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<usize> = nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(nodes[next].children.iter().rev().copied());
        }
        out
    }

    fn text_of(&self, id: usize) -> String {
        let nodes = self.nodes.borrow();
        let mut parts = Vec::new();
        if !nodes[id].text.is_empty() {
            parts.push(nodes[id].text.clone());
        }
        let children = nodes[id].children.clone();
        drop(nodes);
        for child in children {
            let text = self.text_of(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }

    fn with_role(&self, scope: usize, role: Role) -> Vec<MockNode<'_>> {
        let ids = self.descendant_ids(scope);
        let nodes = self.nodes.borrow();
        ids.into_iter()
            .filter(|id| nodes[*id].role == Some(role))
            .map(|id| MockNode { page: self, id })
            .collect()
    }

    fn apply_click(&self, id: usize) {
        let mut nodes = self.nodes.borrow_mut();
        let mut target = Some(id);
        while let Some(t) = target {
            if matches!(nodes[t].role, Some(Role::Radio) | Some(Role::Checkbox)) {
                break;
            }
            target = nodes[t].parent;
        }
        let Some(control) = target else {
            return;
        };

        match nodes[control].role {
            Some(Role::Checkbox) => {
                let checked = nodes[control].attrs.get("aria-checked").map(String::as_str) == Some("true");
                nodes[control]
                    .attrs
                    .insert("aria-checked".to_string(), (!checked).to_string());
            }
            Some(Role::Radio) => {
                if let Some(parent) = nodes[control].parent {
                    let siblings = nodes[parent].children.clone();
                    for s in siblings {
                        if nodes[s].role == Some(Role::Radio) {
                            nodes[s].attrs.insert("aria-checked".to_string(), "false".to_string());
                        }
                    }
                }
                nodes[control].attrs.insert("aria-checked".to_string(), "true".to_string());
            }
            _ => {}
        }
    }
}

impl FormPage for MockPage {
    type Node<'a> = MockNode<'a> where Self: 'a;

    fn by_role(&self, role: Role) -> Result<Vec<MockNode<'_>>> {
        Ok(self.with_role(ROOT, role))
    }

    fn wait_for_quiescence(&self, _timeout: Duration) -> bool {
        self.events.borrow_mut().push(Event::Idle);
        self.idle.get()
    }

    fn pause(&self, duration: Duration) {
        self.events.borrow_mut().push(Event::Pause(duration));
    }

    fn screenshot(&self, path: &Path) -> Result<()> {
        self.events.borrow_mut().push(Event::Screenshot(path.to_path_buf()));
        Ok(())
    }
}

impl<'a> FormNode for MockNode<'a> {
    fn by_role(&self, role: Role) -> Result<Vec<Self>> {
        Ok(self.page.with_role(self.id, role))
    }

    fn descendants(&self) -> Result<Vec<Self>> {
        Ok(self
            .page
            .descendant_ids(self.id)
            .into_iter()
            .map(|id| MockNode { page: self.page, id })
            .collect())
    }

    fn inner_text(&self) -> Result<String> {
        Ok(self.page.text_of(self.id))
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.page.nodes.borrow()[self.id].attrs.get(name).cloned())
    }

    fn click(&self, timeout: Duration) -> Result<()> {
        let name = self.accessible_name()?;
        if self.page.nodes.borrow()[self.id].stuck {
            return Err(FillError::ClickTimeout { target: name, timeout }.into());
        }
        self.page.apply_click(self.id);
        self.page.events.borrow_mut().push(Event::Click { node: self.id, name });
        Ok(())
    }

    fn scroll_into_view(&self, _timeout: Duration) -> Result<()> {
        self.page.events.borrow_mut().push(Event::Scroll(self.id));
        Ok(())
    }
}
