//! Fixed constants of the target survey: question titles, answer catalogs and
//! the default weights used by the weighted answer strategy.
//!
//! Questions are identified by a substring of their rendered title because the
//! form exposes no stable field ids. No catalog entry is ever an "Otros" /
//! free-text option.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    SingleSelect,
    MultiSelect,
    RatingMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKey {
    Semestre,
    Herramientas,
    SoVirtualizados,
    Impedimentos,
    TipoEquipo,
    Cpu,
    Ram,
    TipoAlmacenamiento,
    CapacidadAlmacenamiento,
    Gpu,
    Preferencia,
    Beneficios,
    Preocupaciones,
}

impl QuestionKey {
    pub const ALL: [QuestionKey; 13] = [
        QuestionKey::Semestre,
        QuestionKey::Herramientas,
        QuestionKey::SoVirtualizados,
        QuestionKey::Impedimentos,
        QuestionKey::TipoEquipo,
        QuestionKey::Cpu,
        QuestionKey::Ram,
        QuestionKey::TipoAlmacenamiento,
        QuestionKey::CapacidadAlmacenamiento,
        QuestionKey::Gpu,
        QuestionKey::Preferencia,
        QuestionKey::Beneficios,
        QuestionKey::Preocupaciones,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKey::Semestre => "semestre",
            QuestionKey::Herramientas => "herramientas",
            QuestionKey::SoVirtualizados => "so_virtualizados",
            QuestionKey::Impedimentos => "impedimentos",
            QuestionKey::TipoEquipo => "tipo_equipo",
            QuestionKey::Cpu => "cpu",
            QuestionKey::Ram => "ram",
            QuestionKey::TipoAlmacenamiento => "tipo_almacenamiento",
            QuestionKey::CapacidadAlmacenamiento => "capacidad_almacenamiento",
            QuestionKey::Gpu => "gpu",
            QuestionKey::Preferencia => "preferencia",
            QuestionKey::Beneficios => "beneficios",
            QuestionKey::Preocupaciones => "preocupaciones",
        }
    }

    pub fn spec(&self) -> QuestionSpec {
        let (title_substring, kind) = match self {
            QuestionKey::Semestre => ("¿En qué semestre te encuentras?", QuestionKind::SingleSelect),
            QuestionKey::Herramientas => (
                "¿Qué herramientas usas hoy para prácticas?",
                QuestionKind::MultiSelect,
            ),
            QuestionKey::SoVirtualizados => (
                "¿Qué sistemas operativos virtualizas en tu equipo personal?",
                QuestionKind::MultiSelect,
            ),
            QuestionKey::Impedimentos => (
                "¿qué es lo que falla o te impide usarlos correctamente en tu equipo personal?",
                QuestionKind::MultiSelect,
            ),
            QuestionKey::TipoEquipo => ("¿Qué tipo de equipo utilizar", QuestionKind::SingleSelect),
            QuestionKey::Cpu => ("¿Con qué procesador cuenta tu equipo", QuestionKind::SingleSelect),
            QuestionKey::Ram => ("¿Con cuánta memoria RAM", QuestionKind::SingleSelect),
            QuestionKey::TipoAlmacenamiento => (
                "¿Cuál es el tipo de almacenamiento principal",
                QuestionKind::SingleSelect,
            ),
            QuestionKey::CapacidadAlmacenamiento => (
                "¿Cuál es la capacidad total de memoria principal aproximada",
                QuestionKind::SingleSelect,
            ),
            QuestionKey::Gpu => (
                "¿Con qué tipo de gráficos cuenta tu equipo principal",
                QuestionKind::SingleSelect,
            ),
            QuestionKey::Preferencia => ("¿Prefieres utilizar un servicio", QuestionKind::SingleSelect),
            QuestionKey::Beneficios => (
                "¿Qué beneficios considera más importantes",
                QuestionKind::RatingMatrix,
            ),
            QuestionKey::Preocupaciones => (
                "¿Qué preocupaciones le genera el uso",
                QuestionKind::RatingMatrix,
            ),
        };
        QuestionSpec {
            key: *self,
            title_substring,
            kind,
        }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        QuestionKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown question key: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionSpec {
    pub key: QuestionKey,
    pub title_substring: &'static str,
    pub kind: QuestionKind,
}

/// Question order per survey page.
pub const PAGE1: [QuestionKey; 4] = [
    QuestionKey::Semestre,
    QuestionKey::Herramientas,
    QuestionKey::SoVirtualizados,
    QuestionKey::Impedimentos,
];

pub const PAGE2: [QuestionKey; 6] = [
    QuestionKey::TipoEquipo,
    QuestionKey::Cpu,
    QuestionKey::Ram,
    QuestionKey::TipoAlmacenamiento,
    QuestionKey::CapacidadAlmacenamiento,
    QuestionKey::Gpu,
];

pub const PAGE3: [QuestionKey; 3] = [
    QuestionKey::Preferencia,
    QuestionKey::Beneficios,
    QuestionKey::Preocupaciones,
];

/// A multi-select answer that stands alone ("Ninguno" and friends). When drawn
/// it replaces the whole selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExclusiveAnswer {
    pub label: &'static str,
    pub probability: f64,
}

pub struct OptionCatalog;

impl OptionCatalog {
    /// Ordered option labels a generated answer may use.
    pub fn options(key: QuestionKey) -> &'static [&'static str] {
        match key {
            QuestionKey::Semestre => &["1 - 3", "4 - 5", "6 - 9", "10 - 15", "Egresado / Profesional"],
            QuestionKey::Herramientas => &[
                "Packet Tracer",
                "GNS3",
                "EVE-NG",
                "Wireshark",
                "Snort",
                "Matlab",
            ],
            QuestionKey::SoVirtualizados => &[
                "Ubuntu LTS (Desktop/Server)",
                "Debian",
                "Kali Linux",
                "Windows Server 2019/2022",
                "pfSense (firewall/router)",
            ],
            QuestionKey::Impedimentos => &[
                "Bajo rendimiento del equipo (CPU/RAM/disco; el programa se congela o va lento)",
                "Sistema operativo/versión no compatible (Windows/macOS/Linux/ARM)",
                "Drivers o dependencias faltantes (.NET/Java/SDKs, controladores de GPU/red)",
                "Virtualización/Docker/WSL no funcionan (VT-x/AMD-V desactivado, errores de arranque)",
                "Restricciones de red/seguridad (antivirus, firewall, VPN o internet inestable)",
            ],
            QuestionKey::TipoEquipo => &["Laptop (Portátil)", "Computadora de escritorio (Desktop)"],
            QuestionKey::Cpu => &["Intel", "AMD", "Apple (Serie M)"],
            QuestionKey::Ram => &["4GB o menos", "8 GB", "16 GB", "32 GB o más"],
            QuestionKey::TipoAlmacenamiento => &[
                "Disco de Estado Sólido (SSD)",
                "Disco duro Mecánico (HDD)",
                "Híbrido (SSD + HDD)",
            ],
            QuestionKey::CapacidadAlmacenamiento => &["256 GB o menos", "512 GB", "1 TB", "Más de 1 TB"],
            QuestionKey::Gpu => &["Integrados", "Dedicados"],
            QuestionKey::Preferencia => &["Servicios en la nube", "Computadora personal"],
            // Matrices are answered by column permutation at fill time.
            QuestionKey::Beneficios | QuestionKey::Preocupaciones => &[],
        }
    }

    pub fn exclusive(key: QuestionKey) -> Option<ExclusiveAnswer> {
        match key {
            QuestionKey::Herramientas => Some(ExclusiveAnswer {
                label: "Ninguno",
                probability: 0.15,
            }),
            QuestionKey::SoVirtualizados => Some(ExclusiveAnswer {
                label: "No uso virtualización",
                probability: 0.20,
            }),
            QuestionKey::Impedimentos => Some(ExclusiveAnswer {
                label: "Ninguno",
                probability: 0.20,
            }),
            _ => None,
        }
    }

    /// Upper bound on how many options a generated multi-select answer picks.
    pub fn max_picks(key: QuestionKey) -> usize {
        let cap = match key {
            QuestionKey::Herramientas => 4,
            QuestionKey::SoVirtualizados | QuestionKey::Impedimentos => 3,
            _ => 1,
        };
        cap.min(Self::options(key).len())
    }
}

/// Per-question option weights. Weights are renormalised at sampling time and
/// an option missing from the table is never chosen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    weights: BTreeMap<QuestionKey, BTreeMap<String, f64>>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_question(&self, key: QuestionKey) -> Option<&BTreeMap<String, f64>> {
        self.weights.get(&key)
    }

    #[cfg(test)]
    pub fn weight(&self, key: QuestionKey, option: &str) -> f64 {
        self.weights
            .get(&key)
            .and_then(|m| m.get(option))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, key: QuestionKey, option: impl Into<String>, weight: f64) {
        self.weights
            .entry(key)
            .or_default()
            .insert(option.into(), weight.max(0.0));
    }

    /// Replaces the whole weight map of every question present in `overrides`.
    /// Keys are question names as used in answer files (`cpu`, `ram`, ...).
    pub fn merge_overrides(&mut self, overrides: &BTreeMap<String, BTreeMap<String, f64>>) -> Result<()> {
        for (name, table) in overrides {
            let key: QuestionKey = name.parse()?;
            let allowed = OptionCatalog::options(key);
            let mut cleaned = BTreeMap::new();
            for (option, weight) in table {
                if !allowed.contains(&option.as_str()) {
                    log::warn!("[Catalog] Ignoring weight for unknown option '{}' of '{}'", option, key);
                    continue;
                }
                if *weight < 0.0 || !weight.is_finite() {
                    return Err(anyhow!("Weight for '{}' in '{}' must be a non-negative number", option, key));
                }
                cleaned.insert(option.clone(), *weight);
            }
            self.weights.insert(key, cleaned);
        }
        Ok(())
    }

    /// Built-in respondent profile for the weighted strategy.
    pub fn survey_defaults() -> Self {
        let mut table = Self::new();
        let defaults: &[(QuestionKey, &[f64])] = &[
            (QuestionKey::Semestre, &[2.0, 3.0, 4.0, 2.5, 1.0]),
            (QuestionKey::Herramientas, &[5.0, 3.0, 1.5, 4.0, 1.0, 2.0]),
            (QuestionKey::SoVirtualizados, &[5.0, 2.0, 4.0, 2.5, 1.5]),
            (QuestionKey::Impedimentos, &[5.0, 2.0, 2.5, 3.0, 1.5]),
            (QuestionKey::TipoEquipo, &[8.0, 2.0]),
            (QuestionKey::Cpu, &[5.0, 4.0, 1.0]),
            (QuestionKey::Ram, &[1.5, 5.0, 4.0, 1.0]),
            (QuestionKey::TipoAlmacenamiento, &[6.0, 1.0, 2.0]),
            (QuestionKey::CapacidadAlmacenamiento, &[3.0, 5.0, 2.5, 1.0]),
            (QuestionKey::Gpu, &[6.0, 4.0]),
            (QuestionKey::Preferencia, &[1.0, 1.0]),
        ];
        for (key, weights) in defaults {
            for (option, weight) in OptionCatalog::options(*key).iter().zip(weights.iter()) {
                table.set(*key, *option, *weight);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_never_offers_free_text() {
        for key in QuestionKey::ALL {
            for option in OptionCatalog::options(key) {
                let lower = option.to_lowercase();
                assert!(!lower.starts_with("otro"), "{} offers '{}'", key, option);
            }
        }
    }

    #[test]
    fn test_pages_cover_every_question_once() {
        let mut seen: Vec<QuestionKey> = PAGE1.iter().chain(PAGE2.iter()).chain(PAGE3.iter()).copied().collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), QuestionKey::ALL.len());
    }

    #[test]
    fn test_key_names_round_trip_through_from_str() {
        assert_eq!("capacidad_almacenamiento".parse::<QuestionKey>().unwrap(), QuestionKey::CapacidadAlmacenamiento);
        assert!("capacidad".parse::<QuestionKey>().is_err());
    }

    #[test]
    fn test_default_weights_cover_every_single_and_multi_option() {
        let table = WeightTable::survey_defaults();
        for key in QuestionKey::ALL {
            if key.spec().kind == QuestionKind::RatingMatrix {
                continue;
            }
            for option in OptionCatalog::options(key) {
                assert!(table.weight(key, option) > 0.0, "{} / {}", key, option);
            }
        }
    }

    #[test]
    fn test_merge_overrides_replaces_question_table() {
        let mut table = WeightTable::survey_defaults();
        let mut overrides = BTreeMap::new();
        let mut cpu = BTreeMap::new();
        cpu.insert("AMD".to_string(), 1.0);
        cpu.insert("Cyrix".to_string(), 9.0);
        overrides.insert("cpu".to_string(), cpu);

        table.merge_overrides(&overrides).unwrap();
        assert_eq!(table.weight(QuestionKey::Cpu, "AMD"), 1.0);
        assert_eq!(table.weight(QuestionKey::Cpu, "Intel"), 0.0);
        assert_eq!(table.weight(QuestionKey::Cpu, "Cyrix"), 0.0);
        assert!(table.weight(QuestionKey::Ram, "8 GB") > 0.0);
    }

    #[test]
    fn test_merge_overrides_rejects_negative_weight() {
        let mut table = WeightTable::new();
        let mut overrides = BTreeMap::new();
        overrides.insert("gpu".to_string(), BTreeMap::from([("Dedicados".to_string(), -1.0)]));
        assert!(table.merge_overrides(&overrides).is_err());
    }
}
