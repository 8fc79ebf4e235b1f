use crate::catalog::{OptionCatalog, QuestionKey, WeightTable};
use crate::sampling::{self, Weights};
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Selections for the whole survey. Built once, consumed once by the sequencer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page1: Option<Page1Answers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page2: Option<Page2Answers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page3: Option<Page3Answers>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page1Answers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semestre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub herramientas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub so_virtualizados: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impedimentos: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page2Answers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_equipo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_almacenamiento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacidad_almacenamiento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page3Answers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferencia: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficios_permutar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preocupaciones_permutar: Option<bool>,
    /// Explicit `{row label -> 1..N}` values, used only when the matching
    /// permutation flag is `false`. Values outside the scale are accepted
    /// here and saturated when the matrix is filled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficios: Option<BTreeMap<String, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preocupaciones: Option<BTreeMap<String, i64>>,
}

/// How one rating matrix gets answered.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixPlan<'a> {
    Permutation,
    Values(&'a BTreeMap<String, i64>),
}

impl Page1Answers {
    pub fn is_empty(&self) -> bool {
        self.semestre.is_none()
            && self.herramientas.is_none()
            && self.so_virtualizados.is_none()
            && self.impedimentos.is_none()
    }
}

impl Page2Answers {
    pub fn is_empty(&self) -> bool {
        self.tipo_equipo.is_none()
            && self.cpu.is_none()
            && self.ram.is_none()
            && self.tipo_almacenamiento.is_none()
            && self.capacidad_almacenamiento.is_none()
            && self.gpu.is_none()
    }

    pub fn single(&self, key: QuestionKey) -> Option<&str> {
        match key {
            QuestionKey::TipoEquipo => self.tipo_equipo.as_deref(),
            QuestionKey::Cpu => self.cpu.as_deref(),
            QuestionKey::Ram => self.ram.as_deref(),
            QuestionKey::TipoAlmacenamiento => self.tipo_almacenamiento.as_deref(),
            QuestionKey::CapacidadAlmacenamiento => self.capacidad_almacenamiento.as_deref(),
            QuestionKey::Gpu => self.gpu.as_deref(),
            _ => None,
        }
    }
}

impl Page3Answers {
    pub fn is_empty(&self) -> bool {
        self.preferencia.is_none()
            && self.beneficios_permutar.is_none()
            && self.preocupaciones_permutar.is_none()
            && self.beneficios.is_none()
            && self.preocupaciones.is_none()
    }

    /// Permutation unless the flag is explicitly `false` and a value map exists.
    pub fn matrix_plan(&self, key: QuestionKey) -> MatrixPlan<'_> {
        let (flag, values) = match key {
            QuestionKey::Beneficios => (self.beneficios_permutar, self.beneficios.as_ref()),
            QuestionKey::Preocupaciones => (self.preocupaciones_permutar, self.preocupaciones.as_ref()),
            _ => return MatrixPlan::Permutation,
        };
        match (flag.unwrap_or(true), values) {
            (false, Some(map)) => MatrixPlan::Values(map),
            _ => MatrixPlan::Permutation,
        }
    }
}

impl AnswerDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read answers file at {:?}", path))?;
        let doc: AnswerDocument = serde_json::from_str(&content)
            .context(format!("Failed to parse answers file at {:?}", path))?;
        doc.warn_unknown_labels();
        Ok(doc)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize answers")
    }

    /// Labels are matched by substring on the live page, so an unknown label
    /// is not fatal here; it only fails later if the page has no such control.
    fn warn_unknown_labels(&self) {
        let check = |key: QuestionKey, label: &str| {
            let known = OptionCatalog::options(key).iter().any(|o| o.contains(label))
                || OptionCatalog::exclusive(key).is_some_and(|e| e.label.contains(label));
            if !known {
                log::warn!("[Answers] '{}' is not a catalog option of '{}'", label, key);
            }
        };

        if let Some(p1) = &self.page1 {
            if let Some(s) = &p1.semestre {
                check(QuestionKey::Semestre, s);
            }
            for (key, labels) in [
                (QuestionKey::Herramientas, &p1.herramientas),
                (QuestionKey::SoVirtualizados, &p1.so_virtualizados),
                (QuestionKey::Impedimentos, &p1.impedimentos),
            ] {
                for label in labels.iter().flatten() {
                    check(key, label);
                }
            }
        }
        if let Some(p2) = &self.page2 {
            for key in crate::catalog::PAGE2 {
                if let Some(label) = p2.single(key) {
                    check(key, label);
                }
            }
        }
        if let Some(p3) = &self.page3 {
            if let Some(p) = &p3.preferencia {
                check(QuestionKey::Preferencia, p);
            }
        }
    }
}

/// Source of the answers for one run.
#[derive(Debug, Clone)]
pub enum AnswerStrategy {
    Fixed(AnswerDocument),
    Uniform,
    Weighted(WeightTable),
}

impl AnswerStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AnswerStrategy::Fixed(_) => "fixed",
            AnswerStrategy::Uniform => "uniform",
            AnswerStrategy::Weighted(_) => "weighted",
        }
    }

    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> AnswerDocument {
        match self {
            AnswerStrategy::Fixed(doc) => doc,
            AnswerStrategy::Uniform => AnswerSetBuilder::new(Sampler::Uniform).build(rng),
            AnswerStrategy::Weighted(table) => AnswerSetBuilder::new(Sampler::Weighted(&table)).build(rng),
        }
    }
}

enum Sampler<'w> {
    Uniform,
    Weighted(&'w WeightTable),
}

/// Composes the catalog with the sampling engine into a complete document.
/// Matrices are left in permutation mode; they are resolved at fill time.
struct AnswerSetBuilder<'w> {
    sampler: Sampler<'w>,
    empty: Weights,
}

impl<'w> AnswerSetBuilder<'w> {
    fn new(sampler: Sampler<'w>) -> Self {
        Self {
            sampler,
            empty: Weights::new(),
        }
    }

    fn weights(&self, key: QuestionKey) -> &Weights {
        match &self.sampler {
            Sampler::Uniform => &self.empty,
            Sampler::Weighted(table) => table.for_question(key).unwrap_or(&self.empty),
        }
    }

    fn single<R: Rng + ?Sized>(&self, key: QuestionKey, rng: &mut R) -> Option<String> {
        let options = OptionCatalog::options(key);
        let choice = match &self.sampler {
            Sampler::Uniform => sampling::weighted_choice(options, &self.empty, rng),
            Sampler::Weighted(_) => sampling::weighted_choice(options, self.weights(key), rng),
        };
        choice.map(str::to_string)
    }

    fn multi<R: Rng + ?Sized>(&self, key: QuestionKey, rng: &mut R) -> Vec<String> {
        if let Some(exclusive) = OptionCatalog::exclusive(key) {
            if rng.gen_bool(exclusive.probability) {
                return vec![exclusive.label.to_string()];
            }
        }

        let options = OptionCatalog::options(key);
        let max = OptionCatalog::max_picks(key);
        let picked = match &self.sampler {
            Sampler::Uniform => {
                let k = sampling::uniform_k(1, max, rng);
                sampling::weighted_sample_unique(options, &self.empty, k, rng)
            }
            Sampler::Weighted(_) => {
                let k = sampling::random_k(1, max, rng);
                sampling::weighted_sample_unique(options, self.weights(key), k, rng)
            }
        };
        picked.into_iter().map(str::to_string).collect()
    }

    fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> AnswerDocument {
        let page1 = Page1Answers {
            semestre: self.single(QuestionKey::Semestre, rng),
            herramientas: Some(self.multi(QuestionKey::Herramientas, rng)),
            so_virtualizados: Some(self.multi(QuestionKey::SoVirtualizados, rng)),
            impedimentos: Some(self.multi(QuestionKey::Impedimentos, rng)),
        };

        let page2 = Page2Answers {
            tipo_equipo: self.single(QuestionKey::TipoEquipo, rng),
            cpu: self.single(QuestionKey::Cpu, rng),
            ram: self.single(QuestionKey::Ram, rng),
            tipo_almacenamiento: self.single(QuestionKey::TipoAlmacenamiento, rng),
            capacidad_almacenamiento: self.single(QuestionKey::CapacidadAlmacenamiento, rng),
            gpu: self.single(QuestionKey::Gpu, rng),
        };

        let page3 = Page3Answers {
            preferencia: self.single(QuestionKey::Preferencia, rng),
            beneficios_permutar: Some(true),
            preocupaciones_permutar: Some(true),
            beneficios: None,
            preocupaciones: None,
        };

        AnswerDocument {
            page1: Some(page1),
            page2: Some(page2),
            page3: Some(page3),
        }
    }
}
