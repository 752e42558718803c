// src/services/normalizer.rs

use std::collections::HashSet;

use crate::{
    config::registry::TableSchema,
    models::dataset::Dataset,
};

/// Resultado do casamento dos cabeçalhos da planilha com o esquema.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    /// (índice na planilha, nome canônico)
    pub matched: Vec<(usize, String)>,
    /// Cabeçalhos descartados, na grafia original.
    pub unrecognized: Vec<String>,
}

/// Casa cada cabeçalho (sem diferenciar maiúsculas, com aliases) com uma
/// coluna do esquema. Se dois cabeçalhos caem na mesma coluna, fica o
/// primeiro e o segundo é reportado como não reconhecido.
pub fn map_columns(headers: &[String], schema: &TableSchema) -> ColumnMapping {
    let mut matched = Vec::new();
    let mut unrecognized = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();

    for (idx, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        if trimmed.is_empty() {
            unrecognized.push(format!("coluna_{}", idx + 1));
            continue;
        }
        match schema.column(trimmed) {
            Some(spec) if taken.insert(spec.name.clone()) => {
                matched.push((idx, spec.name.clone()));
            }
            Some(spec) => {
                tracing::warn!(
                    "Coluna '{}' repete '{}' em '{}'; mantida a primeira ocorrência",
                    trimmed, spec.name, schema.name
                );
                unrecognized.push(trimmed.to_string());
            }
            None => unrecognized.push(trimmed.to_string()),
        }
    }

    ColumnMapping { matched, unrecognized }
}

/// Projeta o dataset cru nas colunas reconhecidas, já com o nome canônico.
pub fn normalize(raw: &Dataset, schema: &TableSchema) -> (Dataset, Vec<String>) {
    let mapping = map_columns(raw.columns(), schema);
    if !mapping.unrecognized.is_empty() {
        tracing::warn!(
            "Colunas ignoradas em '{}': {}",
            schema.name,
            mapping.unrecognized.join(", ")
        );
    }

    let mut out = Dataset::new(mapping.matched.iter().map(|(_, name)| name.clone()).collect());
    for row in 0..raw.len() {
        let values = mapping
            .matched
            .iter()
            .map(|(idx, _)| raw.value(row, *idx).clone())
            .collect();
        out.push_row(values);
    }
    (out, mapping.unrecognized)
}
