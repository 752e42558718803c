// src/models/classification.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Grupos calculados a partir das viagens, sem linha na tabela de despesas.
pub const BREAKAGE_GROUP: &str = "VALOR QUEBRA";
pub const COMMISSION_GROUP: &str = "COMISSÃO DE MOTORISTA";
pub const SYNTHETIC_GROUPS: [&str; 2] = [BREAKAGE_GROUP, COMMISSION_GROUP];

pub fn is_synthetic(group: &str) -> bool {
    SYNTHETIC_GROUPS.contains(&group)
}

/// "S" / "N", como gravado no banco.
pub fn flag_char(flag: bool) -> &'static str {
    if flag { "S" } else { "N" }
}

pub fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("S")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Despesa,
    CustoViagem,
    Nenhum,
}

impl Classification {
    pub fn flags(self) -> GroupFlags {
        match self {
            Classification::Despesa => GroupFlags { is_despesa: true, ..GroupFlags::NONE },
            Classification::CustoViagem => GroupFlags { is_custo_viagem: true, ..GroupFlags::NONE },
            Classification::Nenhum => GroupFlags::NONE,
        }
    }

    // Com as duas flags ligadas (só possível por fora da API), custo prevalece.
    pub fn from_flags(flags: GroupFlags) -> Self {
        if flags.is_custo_viagem {
            Classification::CustoViagem
        } else if flags.is_despesa {
            Classification::Despesa
        } else {
            Classification::Nenhum
        }
    }
}

/// Em qual balde um grupo de despesa entra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupFlags {
    pub is_despesa: bool,
    pub is_custo_viagem: bool,
    /// Soma no total de despesas tipo D (VED = 'D').
    pub include_in_type_d: bool,
}

impl GroupFlags {
    pub const NONE: GroupFlags = GroupFlags { is_despesa: false, is_custo_viagem: false, include_in_type_d: false };

    pub fn with_type_d(self, include_in_type_d: bool) -> Self {
        Self { include_in_type_d, ..self }
    }
}

impl Default for GroupFlags {
    // Padrão de grupo recém-descoberto (e de grupo sem linha de flag).
    fn default() -> Self {
        Self { is_despesa: true, ..Self::NONE }
    }
}

/// Flags de todos os grupos de um tenant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationFlags {
    groups: HashMap<String, GroupFlags>,
}

impl ClassificationFlags {
    pub fn new(groups: HashMap<String, GroupFlags>) -> Self {
        Self { groups }
    }

    pub fn get(&self, group: &str) -> Option<GroupFlags> {
        self.groups.get(group).copied()
    }

    /// Flags do grupo; sem linha cadastrada vale o padrão (despesa).
    pub fn lookup(&self, group: &str) -> GroupFlags {
        self.get(group).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GroupFlags)> {
        self.groups.iter()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseGroupFlag {
    pub group_name: String,
    pub is_despesa: String,
    pub is_custo_viagem: String,
    pub classification: Classification,
    pub incluir_em_tipo_d: bool,
    /// O grupo tem lançamentos VED = 'D' na tabela de despesas.
    pub has_tipo_d: bool,
    pub synthetic: bool,
}

impl ExpenseGroupFlag {
    pub fn new(group_name: String, flags: GroupFlags, has_tipo_d: bool) -> Self {
        Self {
            synthetic: is_synthetic(&group_name),
            group_name,
            is_despesa: flag_char(flags.is_despesa).to_string(),
            is_custo_viagem: flag_char(flags.is_custo_viagem).to_string(),
            classification: Classification::from_flags(flags),
            incluir_em_tipo_d: flags.include_in_type_d,
            has_tipo_d,
        }
    }
}

/// Nova classificação de um grupo: só o balde, ou o balde e a flag tipo D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum GroupUpdate {
    Classification(Classification),
    Detailed {
        classification: Classification,
        #[serde(rename = "incluirEmTipoD", alias = "incluir_tipo_d")]
        include_in_type_d: Option<bool>,
    },
}

impl GroupUpdate {
    pub fn classification(&self) -> Classification {
        match self {
            GroupUpdate::Classification(c) => *c,
            GroupUpdate::Detailed { classification, .. } => *classification,
        }
    }

    /// `None` mantém o valor gravado.
    pub fn include_in_type_d(&self) -> Option<bool> {
        match self {
            GroupUpdate::Classification(_) => None,
            GroupUpdate::Detailed { include_in_type_d, .. } => *include_in_type_d,
        }
    }
}

impl From<Classification> for GroupUpdate {
    fn from(classification: Classification) -> Self {
        GroupUpdate::Classification(classification)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGroupsPayload {
    #[validate(length(min = 1, message = "Informe ao menos um grupo."))]
    pub groups: HashMap<String, GroupUpdate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_round_trips_through_flags() {
        for c in [Classification::Despesa, Classification::CustoViagem, Classification::Nenhum] {
            assert_eq!(Classification::from_flags(c.flags()), c);
        }
        let both = GroupFlags { is_despesa: true, is_custo_viagem: true, include_in_type_d: false };
        assert_eq!(Classification::from_flags(both), Classification::CustoViagem);
    }

    #[test]
    fn unknown_groups_default_to_general_expense() {
        let flags = ClassificationFlags::default();
        assert_eq!(flags.lookup("PNEUS"), GroupFlags { is_despesa: true, ..GroupFlags::NONE });
    }

    #[test]
    fn deserializes_snake_case_classifications() {
        let payload: UpdateGroupsPayload =
            serde_json::from_str(r#"{"groups": {"DIESEL": "custo_viagem", "IPVA": "nenhum"}}"#).unwrap();
        assert_eq!(payload.groups["DIESEL"].classification(), Classification::CustoViagem);
        assert_eq!(payload.groups["DIESEL"].include_in_type_d(), None);
        assert!(payload.validate().is_ok());

        let empty: UpdateGroupsPayload = serde_json::from_str(r#"{"groups": {}}"#).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn accepts_type_d_flag_next_to_the_classification() {
        let payload: UpdateGroupsPayload = serde_json::from_str(
            r#"{"groups": {
                "ALUGUEL": {"classification": "despesa", "incluirEmTipoD": true},
                "IPVA": {"classification": "nenhum"}
            }}"#,
        )
        .unwrap();
        assert_eq!(payload.groups["ALUGUEL"].classification(), Classification::Despesa);
        assert_eq!(payload.groups["ALUGUEL"].include_in_type_d(), Some(true));
        assert_eq!(payload.groups["IPVA"].include_in_type_d(), None);
    }

    #[test]
    fn list_row_exposes_type_d_status() {
        let row = ExpenseGroupFlag::new("ALUGUEL".into(), GroupFlags::default().with_type_d(true), true);
        assert!(row.incluir_em_tipo_d);
        assert!(row.has_tipo_d);
        assert_eq!(row.classification, Classification::Despesa);
        assert!(!row.synthetic);
    }
}
