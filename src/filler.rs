use crate::browser::locator::{find_button, find_control, find_matrix_row, find_question_block};
use crate::browser::{FormNode, FormPage, Role};
use crate::config::TimingConfig;
use crate::error::FillError;
use crate::sampling;
use anyhow::Result;
use rand::Rng;
use std::collections::BTreeMap;

/// A navigation button: the label as rendered in the survey's language, plus
/// the English label some sessions render instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLabel {
    pub primary: &'static str,
    pub fallback: &'static str,
}

pub const NEXT_BUTTON: ButtonLabel = ButtonLabel {
    primary: "Siguiente",
    fallback: "Next",
};

pub const SUBMIT_BUTTON: ButtonLabel = ButtonLabel {
    primary: "Enviar",
    fallback: "Submit",
};

/// Applies answers to one question at a time. Every interaction is followed
/// by a pause or an idle-wait so the page's own re-rendering is serialised
/// with ours.
pub struct FieldFiller<'p, P: FormPage> {
    page: &'p P,
    timing: &'p TimingConfig,
}

impl<'p, P: FormPage> FieldFiller<'p, P> {
    pub fn new(page: &'p P, timing: &'p TimingConfig) -> Self {
        Self { page, timing }
    }

    pub fn page(&self) -> &'p P {
        self.page
    }

    /// Waits for quiescence. A timeout is logged and otherwise ignored.
    pub fn settle(&self) -> bool {
        let idle = self.page.wait_for_quiescence(self.timing.idle_timeout());
        if idle {
            log::debug!("[Filler] Page idle");
        } else {
            log::debug!("[Filler] Idle wait timed out after {:?}, continuing", self.timing.idle_timeout());
        }
        idle
    }

    pub fn apply_single_select(&self, title: &str, label: &str) -> Result<()> {
        log::info!("[Filler] Radio '{}' -> '{}'", title, label);
        let block = find_question_block(self.page, title)?;
        let radio = find_control(&block, title, label, Role::Radio)?;
        radio.click(self.timing.click_timeout())?;
        self.settle();
        Ok(())
    }

    /// Clicks each label in order unless its checkbox is already checked.
    pub fn apply_multi_select(&self, title: &str, labels: &[String]) -> Result<()> {
        log::info!("[Filler] Checkboxes '{}' -> {:?}", title, labels);
        let block = find_question_block(self.page, title)?;
        for label in labels {
            let checkbox = find_control(&block, title, label, Role::Checkbox)?;
            if checkbox.is_checked() {
                log::debug!("[Filler] '{}' already checked", label);
                continue;
            }
            checkbox.click(self.timing.click_timeout())?;
            self.page.pause(self.timing.checkbox_pause());
        }
        self.settle();
        Ok(())
    }

    /// One selection per row, columns taken from a shuffled order that rows
    /// cycle through. Returns the column index chosen for each row.
    pub fn apply_rating_matrix_by_permutation<R: Rng + ?Sized>(&self, title: &str, rng: &mut R) -> Result<Vec<usize>> {
        let block = find_question_block(self.page, title)?;
        let rows = block.by_role(Role::RadioGroup)?;
        if rows.is_empty() {
            return Err(FillError::NoRows(title.to_string()).into());
        }
        let col_count = rows[0].by_role(Role::Radio)?.len();
        if col_count == 0 {
            return Err(FillError::NoColumns(title.to_string()).into());
        }

        let plan = sampling::column_plan(rows.len(), col_count, rng);
        log::info!(
            "[Filler] Matrix '{}': {} rows x {} columns, plan {:?}",
            title,
            rows.len(),
            col_count,
            plan
        );

        for (row, col) in rows.iter().zip(plan.iter()) {
            row.scroll_into_view(self.timing.scroll_timeout())?;
            let radios = row.by_role(Role::Radio)?;
            let target = radios.get(*col).ok_or_else(|| FillError::ControlNotFound {
                question: title.to_string(),
                label: format!("column {}", col + 1),
            })?;
            target.click(self.timing.matrix_click_timeout())?;
            self.page.pause(self.timing.matrix_row_pause());
        }

        self.settle();
        Ok(plan)
    }

    /// Explicit `{row label -> 1..N}` answers. Out of range values saturate
    /// to the first or last column.
    pub fn apply_rating_matrix_by_values(&self, title: &str, row_to_value: &BTreeMap<String, i64>) -> Result<()> {
        log::info!("[Filler] Matrix '{}' with {} explicit rows", title, row_to_value.len());
        let block = find_question_block(self.page, title)?;

        for (row_label, value) in row_to_value {
            let row = find_matrix_row(&block, title, row_label)?;
            row.scroll_into_view(self.timing.scroll_timeout())?;

            let radios = row.by_role(Role::Radio)?;
            if radios.is_empty() {
                return Err(FillError::NoColumns(title.to_string()).into());
            }
            let index = clamp_column(*value, radios.len());
            if index as i64 + 1 != *value {
                log::warn!(
                    "[Filler] Value {} for row '{}' is outside 1..={}, using {}",
                    value,
                    row_label,
                    radios.len(),
                    index + 1
                );
            }
            radios[index].click(self.timing.matrix_click_timeout())?;
            self.page.pause(self.timing.matrix_row_pause());
        }

        self.settle();
        Ok(())
    }

    pub fn advance_page(&self, button: ButtonLabel) -> Result<()> {
        self.press(button)
    }

    pub fn submit_form(&self, button: ButtonLabel) -> Result<()> {
        self.press(button)
    }

    fn press(&self, button: ButtonLabel) -> Result<()> {
        log::info!("[Filler] Pressing '{}'", button.primary);
        let node = find_button(self.page, &[button.primary, button.fallback])?;
        node.click(self.timing.click_timeout())?;
        self.settle();
        Ok(())
    }
}

/// 1-based `value` to a 0-based column index within `[0, col_count)`.
fn clamp_column(value: i64, col_count: usize) -> usize {
    let last = col_count.saturating_sub(1);
    usize::try_from(value.max(1) - 1).map_or(last, |index| index.min(last))
}
