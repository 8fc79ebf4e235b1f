use crate::answers::{AnswerDocument, MatrixPlan, Page1Answers, Page2Answers, Page3Answers};
use crate::browser::FormPage;
use crate::catalog::{QuestionKey, PAGE1, PAGE2, PAGE3};
use crate::filler::{FieldFiller, NEXT_BUTTON, SUBMIT_BUTTON};
use anyhow::Result;
use rand::Rng;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyStage {
    Page1,
    Page2,
    Page3,
    Submitted,
}

impl SurveyStage {
    fn checkpoint(&self) -> &'static str {
        match self {
            SurveyStage::Page1 => "page1_filled.png",
            SurveyStage::Page2 => "page2_filled.png",
            SurveyStage::Page3 => "page3_filled.png",
            SurveyStage::Submitted => "submitted.png",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub stage: SurveyStage,
    pub screenshots: Vec<PathBuf>,
}

/// Drives the three pages strictly forward: fill, advance, fill, advance,
/// fill, submit. Any field failure aborts the run.
pub struct Sequencer<'p, P: FormPage> {
    filler: FieldFiller<'p, P>,
    screenshot_dir: Option<PathBuf>,
    stage: SurveyStage,
    screenshots: Vec<PathBuf>,
}

impl<'p, P: FormPage> Sequencer<'p, P> {
    /// `screenshot_dir` of `None` disables the checkpoint screenshots.
    pub fn new(filler: FieldFiller<'p, P>, screenshot_dir: Option<PathBuf>) -> Self {
        Self {
            filler,
            screenshot_dir,
            stage: SurveyStage::Page1,
            screenshots: Vec::new(),
        }
    }

    pub fn run<R: Rng + ?Sized>(mut self, answers: &AnswerDocument, rng: &mut R) -> Result<RunOutcome> {
        log::info!("[Sequencer] Page 1");
        if let Some(p1) = answers.page1.as_ref().filter(|p| !p.is_empty()) {
            self.fill_page1(p1)?;
        }
        self.checkpoint();
        self.filler.advance_page(NEXT_BUTTON)?;
        self.stage = SurveyStage::Page2;

        log::info!("[Sequencer] Page 2");
        if let Some(p2) = answers.page2.as_ref().filter(|p| !p.is_empty()) {
            self.fill_page2(p2)?;
        }
        self.checkpoint();
        self.filler.advance_page(NEXT_BUTTON)?;
        self.stage = SurveyStage::Page3;

        log::info!("[Sequencer] Page 3");
        if let Some(p3) = answers.page3.as_ref().filter(|p| !p.is_empty()) {
            self.fill_page3(p3, rng)?;
        }
        self.checkpoint();
        self.filler.submit_form(SUBMIT_BUTTON)?;
        self.stage = SurveyStage::Submitted;
        self.checkpoint();

        log::info!("[Sequencer] Form submitted");
        Ok(RunOutcome {
            stage: self.stage,
            screenshots: self.screenshots,
        })
    }

    fn fill_page1(&self, p1: &Page1Answers) -> Result<()> {
        for key in PAGE1 {
            let title = key.spec().title_substring;
            match key {
                QuestionKey::Semestre => {
                    if let Some(label) = &p1.semestre {
                        self.filler.apply_single_select(title, label)?;
                    }
                }
                QuestionKey::Herramientas | QuestionKey::SoVirtualizados | QuestionKey::Impedimentos => {
                    let labels = match key {
                        QuestionKey::Herramientas => &p1.herramientas,
                        QuestionKey::SoVirtualizados => &p1.so_virtualizados,
                        _ => &p1.impedimentos,
                    };
                    if let Some(labels) = labels {
                        self.filler.apply_multi_select(title, labels)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn fill_page2(&self, p2: &Page2Answers) -> Result<()> {
        for key in PAGE2 {
            if let Some(label) = p2.single(key) {
                self.filler.apply_single_select(key.spec().title_substring, label)?;
            }
        }
        Ok(())
    }

    fn fill_page3<R: Rng + ?Sized>(&self, p3: &Page3Answers, rng: &mut R) -> Result<()> {
        for key in PAGE3 {
            let title = key.spec().title_substring;
            match key {
                QuestionKey::Preferencia => {
                    if let Some(label) = &p3.preferencia {
                        self.filler.apply_single_select(title, label)?;
                    }
                }
                QuestionKey::Beneficios | QuestionKey::Preocupaciones => match p3.matrix_plan(key) {
                    MatrixPlan::Permutation => {
                        self.filler.apply_rating_matrix_by_permutation(title, rng)?;
                    }
                    MatrixPlan::Values(values) => {
                        self.filler.apply_rating_matrix_by_values(title, values)?;
                    }
                },
                _ => {}
            }
        }
        Ok(())
    }

    /// Screenshots are evidence, not control flow: a failed capture is logged.
    fn checkpoint(&mut self) {
        let Some(dir) = &self.screenshot_dir else {
            return;
        };
        let path = dir.join(self.stage.checkpoint());
        match self.filler.page().screenshot(&path) {
            Ok(()) => {
                log::info!("[Sequencer] Saved {:?}", path);
                self.screenshots.push(path);
            }
            Err(e) => log::warn!("[Sequencer] Screenshot {:?} failed: {}", path, e),
        }
    }
}
