//! Resolves question blocks, choice controls, matrix rows and buttons from
//! human readable text.
//!
//! Controls are resolved through an ordered [`LocatorChain`]: the accessible
//! role + label lookup first, then the control owned by the label's own
//! wrapper, then a plain text lookup for renderings where the role/name
//! pairing is not exposed at all. The first strategy with a hit wins.

use super::{FormNode, FormPage, Role};
use crate::error::FillError;
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// Elements with the role whose accessible name contains the label.
    RoleAndLabel(Role),
    /// The one control of the role inside the innermost element whose text
    /// contains the label (label rendered beside an unnamed control).
    LabelledControl(Role),
    /// The innermost element whose rendered text contains the label.
    TextContains,
    /// The innermost element whose text contains the label and which owns at
    /// least one control of the role (matrix rows).
    ContainerWith(Role),
}

impl LocatorStrategy {
    fn find<N: FormNode>(&self, scope: &N, label: &str) -> Result<Option<N>> {
        match self {
            LocatorStrategy::RoleAndLabel(role) => {
                for node in scope.by_role(*role)? {
                    if node.accessible_name()?.contains(label) {
                        return Ok(Some(node));
                    }
                }
                Ok(None)
            }
            LocatorStrategy::LabelledControl(role) => {
                let wrapper = innermost(scope.descendants()?, label, |n| Ok(n.by_role(*role)?.len() == 1))?;
                match wrapper {
                    Some(wrapper) => Ok(wrapper.by_role(*role)?.into_iter().next()),
                    None => Ok(None),
                }
            }
            LocatorStrategy::TextContains => innermost(scope.descendants()?, label, |_| Ok(true)),
            LocatorStrategy::ContainerWith(role) => {
                innermost(scope.descendants()?, label, |n| Ok(!n.by_role(*role)?.is_empty()))
            }
        }
    }
}

/// Smallest matching element by rendered text length; document order breaks
/// ties. Help text that merely mentions a label is usually a larger block
/// than the option's own label, so it loses to it.
fn innermost<N, F>(candidates: Vec<N>, label: &str, accept: F) -> Result<Option<N>>
where
    N: FormNode,
    F: Fn(&N) -> Result<bool>,
{
    let mut best: Option<(usize, N)> = None;
    for node in candidates {
        let text = node.inner_text()?;
        if !text.contains(label) {
            continue;
        }
        let len = text.len();
        if best.as_ref().is_some_and(|(best_len, _)| *best_len <= len) {
            continue;
        }
        if accept(&node)? {
            best = Some((len, node));
        }
    }
    Ok(best.map(|(_, node)| node))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    strategies: Vec<LocatorStrategy>,
}

impl LocatorChain {
    pub fn new(strategies: Vec<LocatorStrategy>) -> Self {
        Self { strategies }
    }

    /// Radio or checkbox inside a question block.
    pub fn control(role: Role) -> Self {
        Self::new(vec![
            LocatorStrategy::RoleAndLabel(role),
            LocatorStrategy::LabelledControl(role),
            LocatorStrategy::TextContains,
        ])
    }

    /// One row of a rating matrix.
    pub fn matrix_row() -> Self {
        Self::new(vec![
            LocatorStrategy::RoleAndLabel(Role::RadioGroup),
            LocatorStrategy::ContainerWith(Role::Radio),
        ])
    }

    pub fn resolve<N: FormNode>(&self, scope: &N, label: &str) -> Result<Option<(N, LocatorStrategy)>> {
        for (i, strategy) in self.strategies.iter().enumerate() {
            if let Some(node) = strategy.find(scope, label)? {
                if i > 0 {
                    log::debug!("[Locator] '{}' resolved by fallback {:?}", label, strategy);
                }
                return Ok(Some((node, *strategy)));
            }
        }
        Ok(None)
    }
}

/// The first list item whose rendered text contains `title` (case-sensitive).
pub fn find_question_block<'p, P: FormPage>(page: &'p P, title: &str) -> Result<P::Node<'p>> {
    for block in page.by_role(Role::ListItem)? {
        if block.inner_text()?.contains(title) {
            return Ok(block);
        }
    }
    log::error!("[Locator] Question not found: {}", title);
    Err(FillError::NotFound(title.to_string()).into())
}

pub fn find_control<N: FormNode>(block: &N, question: &str, label: &str, role: Role) -> Result<N> {
    match LocatorChain::control(role).resolve(block, label)? {
        Some((node, _)) => Ok(node),
        None => {
            log::error!("[Locator] No {} labelled '{}' in: {}", role.as_str(), label, question);
            Err(FillError::ControlNotFound {
                question: question.to_string(),
                label: label.to_string(),
            }
            .into())
        }
    }
}

pub fn find_matrix_row<N: FormNode>(block: &N, question: &str, row_label: &str) -> Result<N> {
    match LocatorChain::matrix_row().resolve(block, row_label)? {
        Some((node, _)) => Ok(node),
        None => Err(FillError::ControlNotFound {
            question: question.to_string(),
            label: row_label.to_string(),
        }
        .into()),
    }
}

/// Buttons match on trimmed accessible name, case-insensitively. `names` is
/// tried in order (localised label first, then its English equivalent).
pub fn find_button<'p, P: FormPage>(page: &'p P, names: &[&str]) -> Result<P::Node<'p>> {
    for name in names {
        let wanted = name.to_lowercase();
        for button in page.by_role(Role::Button)? {
            let accessible = button.accessible_name()?.trim().to_lowercase();
            if accessible.contains(&wanted) {
                return Ok(button);
            }
        }
        log::debug!("[Locator] No button named '{}'", name);
    }
    Err(FillError::ButtonNotFound(names.iter().map(|n| n.to_string()).collect()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockPage;

    #[test]
    fn test_block_found_by_title_substring() {
        let page = MockPage::new();
        page.add_single_select("¿Con qué procesador cuenta tu equipo principal? *", &["Intel", "AMD"]);
        page.add_single_select("¿Con cuánta memoria RAM cuenta tu equipo?", &["8 GB", "16 GB"]);

        let block = find_question_block(&page, "¿Con cuánta memoria RAM").unwrap();
        assert!(block.inner_text().unwrap().contains("16 GB"));
    }

    #[test]
    fn test_block_match_is_case_sensitive_and_fails_with_not_found() {
        let page = MockPage::new();
        page.add_single_select("¿Con qué procesador cuenta tu equipo?", &["Intel"]);

        let err = find_question_block(&page, "¿con qué procesador").err().unwrap();
        assert_eq!(
            err.downcast_ref::<FillError>(),
            Some(&FillError::NotFound("¿con qué procesador".to_string()))
        );
    }

    #[test]
    fn test_first_block_wins_on_duplicates() {
        let page = MockPage::new();
        page.add_single_select("Pregunta repetida", &["Primera"]);
        page.add_single_select("Pregunta repetida", &["Segunda"]);

        let block = find_question_block(&page, "Pregunta repetida").unwrap();
        assert!(block.inner_text().unwrap().contains("Primera"));
    }

    #[test]
    fn test_control_resolved_by_role_and_label() {
        let page = MockPage::new();
        page.add_multi_select("Herramientas", &["Packet Tracer", "GNS3"]);
        let block = find_question_block(&page, "Herramientas").unwrap();

        let (node, strategy) = LocatorChain::control(Role::Checkbox)
            .resolve(&block, "GNS3")
            .unwrap()
            .unwrap();
        assert_eq!(strategy, LocatorStrategy::RoleAndLabel(Role::Checkbox));
        assert_eq!(node.attribute("aria-label").unwrap().as_deref(), Some("GNS3"));
    }

    #[test]
    fn test_control_falls_back_to_text() {
        let page = MockPage::new();
        page.add_question_without_roles("Semestre", &["1 - 3", "4 - 5"]);
        let block = find_question_block(&page, "Semestre").unwrap();

        let (node, strategy) = LocatorChain::control(Role::Radio)
            .resolve(&block, "4 - 5")
            .unwrap()
            .unwrap();
        assert_eq!(strategy, LocatorStrategy::TextContains);
        assert_eq!(node.inner_text().unwrap(), "4 - 5");
    }

    #[test]
    fn test_side_label_resolves_to_its_unnamed_control() {
        let page = MockPage::new();
        page.add_multi_select_with_side_labels("Herramientas", &["GNS3", "Wireshark"]);
        let block = find_question_block(&page, "Herramientas").unwrap();

        let (node, strategy) = LocatorChain::control(Role::Checkbox)
            .resolve(&block, "Wireshark")
            .unwrap()
            .unwrap();
        assert_eq!(strategy, LocatorStrategy::LabelledControl(Role::Checkbox));
        assert_eq!(node.attribute("aria-checked").unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn test_text_fallback_prefers_innermost_over_help_text() {
        let page = MockPage::new();
        let item = page.add_question_without_roles("Equipo", &["Laptop"]);
        page.add_text(item, "Si usas una Laptop prestada, responde igualmente.");
        let block = find_question_block(&page, "Equipo").unwrap();

        let node = find_control(&block, "Equipo", "Laptop", Role::Radio).unwrap();
        assert_eq!(node.inner_text().unwrap(), "Laptop");
    }

    #[test]
    fn test_missing_control_is_reported() {
        let page = MockPage::new();
        page.add_single_select("GPU", &["Integrados"]);
        let block = find_question_block(&page, "GPU").unwrap();

        let err = find_control(&block, "GPU", "Dedicados", Role::Radio).err().unwrap();
        assert!(matches!(err.downcast_ref::<FillError>(), Some(FillError::ControlNotFound { .. })));
    }

    #[test]
    fn test_matrix_row_by_label_and_container_fallback() {
        let page = MockPage::new();
        page.add_matrix("Beneficios", &["Costo", "Rendimiento"], 5);
        let block = find_question_block(&page, "Beneficios").unwrap();
        let row = find_matrix_row(&block, "Beneficios", "Rendimiento").unwrap();
        assert_eq!(row.by_role(Role::Radio).unwrap().len(), 5);

        page.add_matrix_without_groups("Preocupaciones", &["Privacidad", "Latencia"], 4);
        let block = find_question_block(&page, "Preocupaciones").unwrap();
        let (row, strategy) = LocatorChain::matrix_row().resolve(&block, "Latencia").unwrap().unwrap();
        assert_eq!(strategy, LocatorStrategy::ContainerWith(Role::Radio));
        assert_eq!(row.by_role(Role::Radio).unwrap().len(), 4);
        assert!(row.inner_text().unwrap().contains("Latencia"));
        assert!(!row.inner_text().unwrap().contains("Privacidad"));
    }

    #[test]
    fn test_button_uses_fallback_name() {
        let page = MockPage::new();
        page.add_button("Next");

        let button = find_button(&page, &["Siguiente", "Next"]).unwrap();
        assert_eq!(button.inner_text().unwrap(), "Next");

        let err = find_button(&page, &["Enviar", "Submit"]).err().unwrap();
        assert!(matches!(err.downcast_ref::<FillError>(), Some(FillError::ButtonNotFound(_))));
    }
}
