// src/services/filter.rs
//
// Filtros do painel (período, placa, filiais, tipo de negócio) aplicados do
// mesmo jeito às cinco tabelas, cada uma com seus nomes de coluna.

use std::collections::HashSet;

use crate::{
    config::registry::FilterColumns,
    models::{dataset::Dataset, filter::ReportFilter},
};

/// Período, placa e filiais. Preserva a ordem das linhas.
pub fn apply(data: &Dataset, filter: &ReportFilter, columns: &FilterColumns) -> Dataset {
    let mut out = data.clone();

    if filter.has_date_filter() {
        if let Some(col) = out.first_column(&columns.date) {
            let (start, end) = (filter.start_date, filter.end_date);
            out = out.retain_rows(|row| match out.value(row, col).as_date() {
                // Data inválida some quando há filtro de período.
                None => false,
                Some(d) => start.is_none_or(|s| d >= s) && end.is_none_or(|e| d <= e),
            });
        }
    }

    if let Some(plate) = filter.plate_filter() {
        if let Some(col) = out.first_column(&columns.plate) {
            out = out.retain_rows(|row| {
                out.value(row, col).as_text().is_some_and(|p| p.to_uppercase() == plate)
            });
        }
    }

    let branches = filter.branch_filter();
    if !branches.is_empty() {
        // Primeira coluna candidata que exista e tenha algum valor.
        let col = columns
            .branch
            .iter()
            .filter_map(|name| out.column(name))
            .find(|&idx| (0..out.len()).any(|row| !out.value(row, idx).is_blank()));
        match col {
            Some(col) => {
                out = out.retain_rows(|row| {
                    out.value(row, col)
                        .as_text()
                        .is_some_and(|b| branches.contains(&b.to_uppercase()))
                });
            }
            None => tracing::debug!("Sem coluna de filial preenchida; filtro de filial ignorado"),
        }
    }

    out
}

/// Despesas do tipo de negócio pedido (`descNegocio`).
pub fn expenses_by_business(expenses: &Dataset, business: &str) -> Dataset {
    let Some(col) = expenses.column("descNegocio") else {
        return expenses.clone();
    };
    let wanted = business.trim();
    expenses.retain_rows(|row| expenses.value(row, col).as_text().as_deref() == Some(wanted))
}

/// Placas de veículos de apoio (`veiculoProprio = 'F'` nas despesas).
pub fn support_plates(expenses: &Dataset) -> HashSet<String> {
    let mut plates = HashSet::new();
    if !expenses.has_column("veiculoProprio") {
        return plates;
    }
    for row in 0..expenses.len() {
        if expenses.text(row, "veiculoProprio").as_deref() == Some("F") {
            if let Some(plate) = expenses.text(row, "placaVeiculo") {
                plates.insert(plate.to_uppercase());
            }
        }
    }
    plates
}

/// Viagens do tipo de negócio: FROTA = frota própria ou apoio;
/// AGENCIAMENTO = terceiros e agregados; qualquer outro = nenhuma viagem.
pub fn trips_by_business(trips: &Dataset, support: &HashSet<String>, business: &str) -> Dataset {
    let Some(freight_type) = trips.column("tipoFrete") else {
        return trips.clone();
    };
    let business = business.trim().to_uppercase();

    if business == "FROTA" {
        trips.retain_rows(|row| {
            trips.value(row, freight_type).as_text().as_deref() == Some("P")
                || trips
                    .text(row, "placaVeiculo")
                    .is_some_and(|p| support.contains(&p.to_uppercase()))
        })
    } else if business.contains("AGENCIAMENTO") {
        trips.retain_rows(|row| {
            matches!(trips.value(row, freight_type).as_text().as_deref(), Some("A") | Some("T"))
        })
    } else {
        trips.retain_rows(|_| false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dataset::Value;
    use chrono::NaiveDate;

    fn date(d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(2024, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    fn expenses() -> Dataset {
        let mut ds = Dataset::new(vec![
            "dataControle".into(),
            "PLACAVEICULO".into(),
            "nomeFilial".into(),
            "nomeFil".into(),
        ]);
        ds.push_row(vec![date(1), Value::Text("abc1234".into()), Value::Null, Value::Text("Matriz".into())]);
        ds.push_row(vec![date(10), Value::Text("XYZ9876".into()), Value::Null, Value::Text("Filial 2".into())]);
        ds.push_row(vec![Value::Null, Value::Text("ABC1234".into()), Value::Null, Value::Text("MATRIZ".into())]);
        ds.push_row(vec![date(20), Value::Text(" ABC1234 ".into()), Value::Null, Value::Text("matriz".into())]);
        ds
    }

    #[test]
    fn no_filter_returns_everything_in_order() {
        let data = expenses();
        let out = apply(&data, &ReportFilter::default(), &FilterColumns::default());
        assert_eq!(out, data);
    }

    #[test]
    fn date_filter_is_inclusive_and_drops_invalid_dates() {
        let filter = ReportFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            ..Default::default()
        };
        let out = apply(&expenses(), &filter, &FilterColumns::default());
        assert_eq!(out.len(), 2);
        assert_eq!(out.text(1, "placaVeiculo").as_deref(), Some("XYZ9876"));
    }

    #[test]
    fn plate_filter_ignores_case_and_spaces() {
        let filter = ReportFilter { plate: "abc1234".into(), ..Default::default() };
        let out = apply(&expenses(), &filter, &FilterColumns::default());
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn branch_filter_uses_first_populated_column() {
        // nomeFilial existe mas está vazia; vale nomeFil.
        let filter = ReportFilter { branches: vec!["Matriz".into()], ..Default::default() };
        let out = apply(&expenses(), &filter, &FilterColumns::default());
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn missing_columns_make_filters_no_ops() {
        let mut ds = Dataset::new(vec!["outra".into()]);
        ds.push_row(vec![Value::Text("x".into())]);
        let filter = ReportFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            plate: "ABC1234".into(),
            branches: vec!["MATRIZ".into()],
            ..Default::default()
        };
        assert_eq!(apply(&ds, &filter, &FilterColumns::default()).len(), 1);
    }

    #[test]
    fn business_type_selects_trips_by_freight_type() {
        let mut trips = Dataset::new(vec!["tipoFrete".into(), "placaVeiculo".into()]);
        trips.push_row(vec![Value::Text("P".into()), Value::Text("AAA0001".into())]);
        trips.push_row(vec![Value::Text("T".into()), Value::Text("BBB0002".into())]);
        trips.push_row(vec![Value::Text("A".into()), Value::Text("CCC0003".into())]);
        trips.push_row(vec![Value::Text("T".into()), Value::Text("APO0004".into())]);

        let support: HashSet<String> = ["APO0004".to_string()].into_iter().collect();
        assert_eq!(trips_by_business(&trips, &support, "FROTA").len(), 2);
        assert_eq!(trips_by_business(&trips, &support, "Agenciamento de Cargas").len(), 3);
        assert!(trips_by_business(&trips, &support, "OUTRO").is_empty());
    }

    #[test]
    fn support_plates_come_from_expenses_flagged_f() {
        let mut ds = Dataset::new(vec!["placaVeiculo".into(), "veiculoProprio".into(), "descNegocio".into()]);
        ds.push_row(vec![Value::Text("apo0004".into()), Value::Text("F".into()), Value::Text("FROTA".into())]);
        ds.push_row(vec![Value::Text("AAA0001".into()), Value::Text("S".into()), Value::Text("OUTRO".into())]);
        assert!(support_plates(&ds).contains("APO0004"));
        assert_eq!(support_plates(&ds).len(), 1);
        assert_eq!(expenses_by_business(&ds, "FROTA").len(), 1);
    }
}
