// src/services/aggregation.rs
//
// Motor de agregação: funções puras sobre os datasets já carregados.
// Quem busca os dados e as flags é o DashboardService.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::{prelude::FromPrimitive, Decimal};

use crate::{
    config::registry::FilterColumns,
    models::{
        classification::{ClassificationFlags, BREAKAGE_GROUP, COMMISSION_GROUP},
        dashboard::{
            BranchCategoryTotals, ExpenseAudit, ExpenseDashboard, FinancialSummary, FuelByVehicle,
            Granularity, NamedCount, NamedValue, PlateEntry, RevenueDashboard, SeriesPoint,
            TimeSeries, TripReport,
        },
        dataset::Dataset,
        filter::{ReportFilter, ALL},
    },
    services::filter,
};

/// Colunas que participam das regras de negócio.
pub mod col {
    pub const NUM_CONHEC: &str = "numConhec";
    pub const COMPANY_FREIGHT: &str = "freteEmpresa";
    pub const DRIVER_FREIGHT: &str = "freteMotorista";
    pub const COMMISSION: &str = "comissao";
    pub const PAY: &str = "pagar";
    pub const FREIGHT_TYPE: &str = "tipoFrete";
    pub const BREAKAGE: &str = "valorQuebra";
    pub const CAN_INVOICE: &str = "permiteFaturar";
    pub const TRIP_DATE: &str = "dataViagemMotorista";
    pub const ISSUE_DATE: &str = "dataEmissao";
    pub const CONTROL_DATE: &str = "dataControle";
    pub const PLATE: &str = "placaVeiculo";
    pub const BRANCH: &str = "nomeFilial";
    pub const BRANCH_SHORT: &str = "nomeFil";
    pub const GROUP: &str = "descGrupoD";
    pub const NET_VALUE: &str = "liquido";
    pub const IS_EXPENSE: &str = "despesa";
    pub const INVOICE_NUMBER: &str = "numNota";
    pub const ITEM: &str = "descItemD";
    pub const QUANTITY: &str = "quantidade";
    pub const TRANSACTION: &str = "codTransacao";
    pub const PAYABLE_VALUE: &str = "liquidoItemNota";
    pub const RECEIVABLE_VALUE: &str = "valorVenc";
    pub const CLIENT: &str = "nomeCliente";
    pub const DRIVER: &str = "nomeMotorista";
    pub const ORIGIN: &str = "cidOrigemFormat";
    pub const DESTINATION: &str = "cidDestinoFormat";
    pub const WEIGHT_OUT: &str = "pesoSaida";
    pub const WEIGHT_IN: &str = "pesoChegada";
    pub const BREAKAGE_KG: &str = "quantidadeQuebra";
    pub const CARGO: &str = "descricaoMercadoria";
    pub const DISTANCE: &str = "kmRodado";
    pub const ADVANCE: &str = "adiantamentoMotorista";
    pub const EXTRA_CHARGES: &str = "despesasAdicionais";
    pub const DISCOUNTS: &str = "outrosDescontos";
    pub const OWN_VEHICLE: &str = "veiculoProprio";
    pub const VED: &str = "VED";
    pub const SERIES: &str = "serie";
    pub const BOOK_VALUE: &str = "vlContabil";
}

// Até 62 dias o gráfico é diário; acima disso, mensal.
const DAILY_SERIES_MAX_DAYS: i64 = 62;
const TOP_N: usize = 10;
const TOP_CARGO: usize = 7;
const OTHERS: &str = "Outros";
const UNKNOWN_BRANCH: &str = "Filial Desconhecida";
const OWN_VEHICLE_TYPE: &str = "Próprio";
// Série das requisições internas; nelas vale o líquido, não o contábil.
const REQUISITION_SERIES: &str = "RQ";

/// Dados brutos de um tenant, uma tabela por papel.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub trips: Dataset,
    pub invoices: Dataset,
    pub expenses: Dataset,
    pub payables: Dataset,
    pub receivables: Dataset,
}

/// Viagens, faturamento e despesas depois dos filtros.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub trips: Dataset,
    pub invoices: Dataset,
    pub expenses: Dataset,
}

/// Um lançamento de custo/despesa, vindo da tabela ou calculado da viagem.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEntry {
    pub group: String,
    pub value: f64,
    pub date: Option<NaiveDate>,
    pub branch: Option<String>,
    pub plate: Option<String>,
    /// numNota (despesa) ou numConhec (quebra/comissão)
    pub document: Option<String>,
    pub item: Option<String>,
    pub quantity: f64,
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub entry: CostEntry,
    pub trip_cost: bool,
    pub general_expense: bool,
}

pub fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Margem em %, zero quando não há receita.
pub fn margin(net: Decimal, revenue: Decimal) -> Decimal {
    if revenue > Decimal::ZERO {
        (net / revenue * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    }
}

fn branch_of(data: &Dataset, row: usize, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|c| data.text(row, c))
}

/// Remove acentos do português e passa para maiúsculas.
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' | 'Ç' => 'C',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

// ==========================================================
// Seleção (filtros)
// ==========================================================

pub fn select(snapshot: &Snapshot, report_filter: &ReportFilter, columns: &FilterColumns) -> Selection {
    let (trips, expenses) = match report_filter.business_type_filter() {
        Some(business) => {
            let support = filter::support_plates(&snapshot.expenses);
            (
                filter::trips_by_business(&snapshot.trips, &support, business),
                filter::expenses_by_business(&snapshot.expenses, business),
            )
        }
        None => (snapshot.trips.clone(), snapshot.expenses.clone()),
    };

    let trips = filter::apply(&trips, report_filter, columns);
    let expenses = filter::apply(&expenses, report_filter, columns);
    let mut invoices = filter::apply(&snapshot.invoices, report_filter, columns);

    // Com viagens cadastradas, o faturamento segue as viagens filtradas.
    if !snapshot.trips.is_empty() {
        let ids: HashSet<String> = (0..trips.len()).filter_map(|r| trips.text(r, col::NUM_CONHEC)).collect();
        invoices = invoices.retain_rows(|r| invoices.text(r, col::NUM_CONHEC).is_some_and(|n| ids.contains(&n)));
    }

    Selection { trips, invoices, expenses }
}

/// Linhas de faturamento liberadas (`permiteFaturar = 'S'`).
pub fn billable(invoices: &Dataset) -> Dataset {
    if !invoices.has_column(col::CAN_INVOICE) {
        return invoices.clone();
    }
    invoices.retain_rows(|r| invoices.text(r, col::CAN_INVOICE).as_deref() == Some("S"))
}

// ==========================================================
// Custos e despesas
// ==========================================================

fn is_type_d(expenses: &Dataset, row: usize) -> bool {
    expenses.text(row, col::VED).as_deref() == Some("D")
}

/// Lançamentos da tabela de despesas. Tipo D fica de fora dos baldes.
pub fn expense_entries(expenses: &Dataset) -> Vec<CostEntry> {
    let check_flag = expenses.has_column(col::IS_EXPENSE);
    (0..expenses.len())
        .filter(|&r| !check_flag || expenses.text(r, col::IS_EXPENSE).as_deref() == Some("S"))
        .filter(|&r| !is_type_d(expenses, r))
        .map(|r| CostEntry {
            group: expenses.text(r, col::GROUP).unwrap_or_default(),
            value: expenses.number(r, col::NET_VALUE),
            date: expenses.date(r, col::CONTROL_DATE),
            branch: branch_of(expenses, r, &[col::BRANCH_SHORT, col::BRANCH]),
            plate: expenses.text(r, col::PLATE).map(|p| p.to_uppercase()),
            document: expenses.text(r, col::INVOICE_NUMBER),
            item: expenses.text(r, col::ITEM),
            quantity: expenses.number(r, col::QUANTITY),
            synthetic: false,
        })
        .collect()
}

/// Quebra e comissão de motorista, calculadas a partir das viagens.
pub fn synthetic_entries(trips: &Dataset) -> Vec<CostEntry> {
    let mut entries = Vec::new();
    for r in 0..trips.len() {
        let base = CostEntry {
            group: String::new(),
            value: 0.0,
            date: trips.date(r, col::TRIP_DATE).or_else(|| trips.date(r, col::ISSUE_DATE)),
            branch: branch_of(trips, r, &[col::BRANCH, col::BRANCH_SHORT]),
            plate: trips.text(r, col::PLATE).map(|p| p.to_uppercase()),
            document: trips.text(r, col::NUM_CONHEC),
            item: None,
            quantity: 0.0,
            synthetic: true,
        };

        let breakage = trips.number(r, col::BREAKAGE);
        if breakage > 0.0 {
            entries.push(CostEntry { group: BREAKAGE_GROUP.to_string(), value: breakage, ..base.clone() });
        }

        let driver_freight = trips.number(r, col::DRIVER_FREIGHT);
        let percentage_freight = trips.text(r, col::FREIGHT_TYPE).as_deref() == Some("P");
        let pay = trips.text(r, col::PAY).as_deref() != Some("N");
        if percentage_freight && driver_freight > 0.0 && pay {
            let commission = driver_freight * trips.number(r, col::COMMISSION) / 100.0;
            entries.push(CostEntry { group: COMMISSION_GROUP.to_string(), value: commission, ..base });
        }
    }
    entries
}

/// Distribui os lançamentos nos baldes. Grupo de despesa entra em todo balde
/// marcado; quebra/comissão entram num só (custo tem prioridade).
pub fn classify(entries: Vec<CostEntry>, flags: &ClassificationFlags) -> Vec<Classified> {
    entries
        .into_iter()
        .map(|entry| {
            let f = flags.lookup(&entry.group);
            let (trip_cost, general_expense) = if entry.synthetic {
                (f.is_custo_viagem, !f.is_custo_viagem && f.is_despesa)
            } else {
                (f.is_custo_viagem, f.is_despesa)
            };
            Classified { entry, trip_cost, general_expense }
        })
        .collect()
}

pub fn cost_breakdown(selection: &Selection, flags: &ClassificationFlags) -> Vec<Classified> {
    let mut entries = expense_entries(&selection.expenses);
    entries.extend(synthetic_entries(&selection.trips));
    classify(entries, flags)
}

fn pending_total(data: &Dataset, value_column: &str) -> Decimal {
    if !data.has_column(value_column) {
        return Decimal::ZERO;
    }
    (0..data.len())
        .filter(|&r| data.get(r, col::TRANSACTION).as_f64().unwrap_or(0.0) == 0.0)
        .map(|r| dec(data.number(r, value_column)))
        .sum()
}

// ==========================================================
// Resumo
// ==========================================================

pub fn summary(selection: &Selection, snapshot: &Snapshot, flags: &ClassificationFlags) -> FinancialSummary {
    let invoices = billable(&selection.invoices);
    let revenue: Decimal = (0..invoices.len()).map(|r| dec(invoices.number(r, col::COMPANY_FREIGHT))).sum();

    let mut invoiced_trips: Vec<String> = Vec::new();
    for r in 0..invoices.len() {
        if let Some(num) = invoices.text(r, col::NUM_CONHEC) {
            if !invoiced_trips.contains(&num) {
                invoiced_trips.push(num);
            }
        }
    }

    let classified = cost_breakdown(selection, flags);
    let trip_cost: Decimal = classified.iter().filter(|c| c.trip_cost).map(|c| dec(c.entry.value)).sum();
    let general_expenses: Decimal =
        classified.iter().filter(|c| c.general_expense).map(|c| dec(c.entry.value)).sum();

    let net_balance = revenue - (trip_cost + general_expenses);

    FinancialSummary {
        revenue,
        trip_cost,
        general_expenses,
        net_balance,
        margin_percent: margin(net_balance, revenue),
        pending_payables: pending_total(&snapshot.payables, col::PAYABLE_VALUE),
        pending_receivables: pending_total(&snapshot.receivables, col::RECEIVABLE_VALUE),
        type_d_expenses: Decimal::ZERO,
        invoiced_trips,
    }
}

/// Despesas tipo D dos grupos marcados para o total. Respeitam período e
/// filiais, nunca placa nem tipo de negócio. Com uma placa própria no filtro o
/// total é rateado por igual entre as placas próprias; outra placa fica com zero.
pub fn type_d_total(
    snapshot: &Snapshot,
    flags: &ClassificationFlags,
    report_filter: &ReportFilter,
    columns: &FilterColumns,
) -> Decimal {
    let any_plate = ReportFilter { plate: ALL.to_string(), ..report_filter.clone() };
    let expenses = filter::apply(&snapshot.expenses, &any_plate, columns);
    let has_book_value = expenses.has_column(col::BOOK_VALUE);

    let total: Decimal = (0..expenses.len())
        .filter(|&r| is_type_d(&expenses, r))
        .filter(|&r| flags.lookup(&expenses.text(r, col::GROUP).unwrap_or_default()).include_in_type_d)
        .map(|r| {
            let requisition = expenses.text(r, col::SERIES).as_deref() == Some(REQUISITION_SERIES);
            let column = if requisition || !has_book_value { col::NET_VALUE } else { col::BOOK_VALUE };
            dec(expenses.number(r, column))
        })
        .sum();

    let Some(plate) = report_filter.plate_filter() else {
        return total;
    };
    let own: Vec<String> = plates_with_types(&snapshot.trips, &snapshot.expenses)
        .into_iter()
        .filter(|p| p.vehicle_type == OWN_VEHICLE_TYPE)
        .map(|p| p.plate.to_uppercase())
        .collect();
    if own.contains(&plate) {
        total / Decimal::from(own.len())
    } else {
        tracing::debug!("Placa {} não é própria; sem rateio de despesas tipo D", plate);
        Decimal::ZERO
    }
}

// ==========================================================
// Séries temporais
// ==========================================================

pub fn granularity(report_filter: &ReportFilter) -> Granularity {
    match (report_filter.start_date, report_filter.end_date) {
        (Some(start), Some(end)) if (end - start).num_days() <= DAILY_SERIES_MAX_DAYS => Granularity::Daily,
        _ => Granularity::Monthly,
    }
}

fn period_start(date: NaiveDate, g: Granularity) -> NaiveDate {
    match g {
        Granularity::Daily => date,
        Granularity::Monthly => date.with_day(1).unwrap_or(date),
    }
}

fn period_label(period: NaiveDate, g: Granularity) -> String {
    match g {
        Granularity::Daily => period.format("%d/%m/%Y").to_string(),
        Granularity::Monthly => period.format("%b/%Y").to_string(),
    }
}

pub fn time_series(selection: &Selection, flags: &ClassificationFlags, report_filter: &ReportFilter) -> TimeSeries {
    let g = granularity(report_filter);
    let mut buckets: BTreeMap<NaiveDate, (Decimal, Decimal, Decimal)> = BTreeMap::new();

    // Receita na data da viagem correspondente (ou na do próprio faturamento).
    let trips = &selection.trips;
    let mut trip_dates: HashMap<String, NaiveDate> = HashMap::new();
    for r in 0..trips.len() {
        if let (Some(num), Some(date)) = (trips.text(r, col::NUM_CONHEC), trips.date(r, col::TRIP_DATE)) {
            trip_dates.entry(num).or_insert(date);
        }
    }

    let invoices = billable(&selection.invoices);
    for r in 0..invoices.len() {
        let date = invoices
            .text(r, col::NUM_CONHEC)
            .and_then(|num| trip_dates.get(&num).copied())
            .or_else(|| invoices.date(r, col::TRIP_DATE));
        if let Some(date) = date {
            buckets.entry(period_start(date, g)).or_default().0 += dec(invoices.number(r, col::COMPANY_FREIGHT));
        }
    }

    for c in cost_breakdown(selection, flags) {
        let Some(date) = c.entry.date else { continue };
        let bucket = buckets.entry(period_start(date, g)).or_default();
        if c.trip_cost {
            bucket.1 += dec(c.entry.value);
        }
        if c.general_expense {
            bucket.2 += dec(c.entry.value);
        }
    }

    let points = buckets
        .into_iter()
        .map(|(period, (revenue, cost, expense))| SeriesPoint {
            period,
            label: period_label(period, g),
            revenue,
            cost,
            expense,
        })
        .collect();

    TimeSeries { granularity: g, points }
}

// ==========================================================
// Rankings
// ==========================================================

fn totals<I>(items: I) -> Vec<NamedValue>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut sums: HashMap<String, Decimal> = HashMap::new();
    for (name, value) in items {
        *sums.entry(name).or_default() += dec(value);
    }
    let mut out: Vec<NamedValue> = sums.into_iter().map(|(name, value)| NamedValue { name, value }).collect();
    out.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    out
}

fn counts<I>(items: I) -> Vec<NamedCount>
where
    I: IntoIterator<Item = String>,
{
    let mut tally: HashMap<String, u64> = HashMap::new();
    for name in items {
        *tally.entry(name).or_default() += 1;
    }
    let mut out: Vec<NamedCount> = tally.into_iter().map(|(name, count)| NamedCount { name, count }).collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    out
}

fn top<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    items.truncate(n);
    items
}

fn route(trips: &Dataset, r: usize) -> Option<String> {
    let origin = trips.text(r, col::ORIGIN)?;
    let destination = trips.text(r, col::DESTINATION)?;
    Some(format!("{origin} -> {destination}"))
}

pub fn revenue_dashboard(
    selection: &Selection,
    flags: &ClassificationFlags,
    report_filter: &ReportFilter,
) -> RevenueDashboard {
    let trips = &selection.trips;
    if trips.is_empty() {
        return RevenueDashboard::default();
    }
    let invoices = billable(&selection.invoices);
    let invoice_rows = 0..invoices.len();
    let trip_rows = 0..trips.len();

    let by_cargo = totals(trip_rows.clone().filter_map(|r| {
        trips.text(r, col::CARGO).map(|cargo| (cargo, trips.number(r, col::COMPANY_FREIGHT)))
    }));
    let revenue_by_cargo = if by_cargo.len() > TOP_CARGO {
        let others: Decimal = by_cargo[TOP_CARGO..].iter().map(|n| n.value).sum();
        let mut head = top(by_cargo, TOP_CARGO);
        head.push(NamedValue { name: OTHERS.to_string(), value: others });
        head
    } else {
        by_cargo
    };

    RevenueDashboard {
        evolution: time_series(selection, flags, report_filter).points,
        top_clients: totals(invoice_rows.clone().filter_map(|r| {
            invoices.text(r, col::CLIENT).map(|c| (c, invoices.number(r, col::COMPANY_FREIGHT)))
        })),
        revenue_by_branch: totals(invoice_rows.filter_map(|r| {
            invoices.text(r, col::BRANCH).map(|b| (b, invoices.number(r, col::COMPANY_FREIGHT)))
        })),
        top_routes: top(counts(trip_rows.clone().filter_map(|r| route(trips, r))), TOP_N),
        volume_by_route: top(
            totals(trip_rows.clone().filter_map(|r| route(trips, r).map(|rt| (rt, trips.number(r, col::WEIGHT_OUT))))),
            TOP_N,
        ),
        trips_by_vehicle: top(
            counts(trip_rows.clone().filter_map(|r| trips.text(r, col::PLATE).map(|p| p.to_uppercase()))),
            TOP_N,
        ),
        revenue_by_driver: top(
            totals(trip_rows.filter_map(|r| {
                trips.text(r, col::DRIVER).map(|d| (d, trips.number(r, col::COMPANY_FREIGHT)))
            })),
            TOP_N,
        ),
        revenue_by_cargo,
    }
}

fn in_group(entry: &CostEntry, needle: &str) -> bool {
    fold_accents(&entry.group).contains(needle)
}

pub fn expense_dashboard(selection: &Selection, flags: &ClassificationFlags) -> ExpenseDashboard {
    let classified = cost_breakdown(selection, flags);

    let mut by_branch: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for c in &classified {
        if !c.trip_cost && !c.general_expense {
            continue;
        }
        let branch = c.entry.branch.clone().unwrap_or_else(|| UNKNOWN_BRANCH.to_string());
        let totals = by_branch.entry(branch).or_default();
        if c.trip_cost {
            totals.0 += dec(c.entry.value);
        }
        if c.general_expense {
            totals.1 += dec(c.entry.value);
        }
    }

    let general = || classified.iter().filter(|c| c.general_expense).map(|c| &c.entry);
    // Cada lançamento uma vez só, mesmo marcado nos dois baldes.
    let counted = || classified.iter().filter(|c| c.trip_cost || c.general_expense).map(|c| &c.entry);

    let mut fuel: HashMap<String, (Decimal, Decimal)> = HashMap::new();
    for e in counted().filter(|e| in_group(e, "COMBUSTIVEL")) {
        if let Some(plate) = &e.plate {
            let acc = fuel.entry(plate.clone()).or_default();
            acc.0 += dec(e.value);
            acc.1 += dec(e.quantity);
        }
    }
    let mut fuel_by_vehicle: Vec<FuelByVehicle> = fuel
        .into_iter()
        .map(|(plate, (value, litres))| FuelByVehicle { plate, value, litres })
        .collect();
    fuel_by_vehicle.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.plate.cmp(&b.plate)));

    ExpenseDashboard {
        by_branch_and_category: by_branch
            .into_iter()
            .map(|(branch, (trip_cost, general_expense))| BranchCategoryTotals { branch, trip_cost, general_expense })
            .collect(),
        top_expense_groups: top(totals(general().map(|e| (e.group.clone(), e.value))), TOP_N),
        expense_by_branch: totals(general().map(|e| {
            (e.branch.clone().unwrap_or_else(|| UNKNOWN_BRANCH.to_string()), e.value)
        })),
        maintenance_by_vehicle: totals(
            counted()
                .filter(|e| in_group(e, "MANUTENCAO"))
                .filter_map(|e| e.plate.clone().map(|p| (p, e.value))),
        ),
        fuel_by_item: totals(
            counted()
                .filter(|e| in_group(e, "COMBUSTIVEL"))
                .filter_map(|e| e.item.clone().map(|i| (i, e.value))),
        ),
        fuel_by_vehicle,
    }
}

// ==========================================================
// Auditoria e relatório de viagem
// ==========================================================

pub fn expense_audit(selection: &Selection, flags: &ClassificationFlags) -> ExpenseAudit {
    fn push(map: &mut BTreeMap<String, Vec<String>>, group: &str, document: &str) {
        let docs = map.entry(group.to_string()).or_default();
        if !docs.iter().any(|d| d == document) {
            docs.push(document.to_string());
        }
    }

    let mut audit = ExpenseAudit::default();
    for c in cost_breakdown(selection, flags) {
        let Some(document) = c.entry.document.as_deref() else { continue };
        if c.trip_cost {
            push(&mut audit.trip_costs, &c.entry.group, document);
        }
        if c.general_expense {
            push(&mut audit.general_expenses, &c.entry.group, document);
        }
    }
    audit
}

fn find_row(data: &Dataset, column: &str, wanted: &str) -> Option<usize> {
    (0..data.len()).find(|&r| data.text(r, column).as_deref() == Some(wanted))
}

/// `None` quando a viagem ou o faturamento não existem.
pub fn trip_report(snapshot: &Snapshot, flags: &ClassificationFlags, num_conhec: &str) -> Option<TripReport> {
    let wanted = num_conhec.trim();
    let trips = &snapshot.trips;
    let invoices = &snapshot.invoices;
    let trip = find_row(trips, col::NUM_CONHEC, wanted)?;
    let invoice = find_row(invoices, col::NUM_CONHEC, wanted)?;

    let trip_date = trips.date(trip, col::TRIP_DATE);
    let plate = trips.text(trip, col::PLATE);

    // Sem vínculo direto despesa x CT-e: mesma placa, mesma data.
    let expenses = &snapshot.expenses;
    let same_day = match (&plate, trip_date) {
        (Some(p), Some(d)) => expenses.retain_rows(|r| {
            expenses.text(r, col::PLATE).is_some_and(|ep| ep.eq_ignore_ascii_case(p))
                && expenses.date(r, col::CONTROL_DATE) == Some(d)
        }),
        _ => Dataset::new(expenses.columns().to_vec()),
    };

    let mut entries = expense_entries(&same_day);
    entries.extend(synthetic_entries(&trips.retain_rows(|r| r == trip)));

    let mut cost_by_group: BTreeMap<String, Decimal> = BTreeMap::new();
    for c in classify(entries, flags).into_iter().filter(|c| c.trip_cost) {
        *cost_by_group.entry(c.entry.group).or_default() += dec(c.entry.value);
    }
    let total_costs: Decimal = cost_by_group.values().copied().sum();
    let gross_freight = dec(invoices.number(invoice, col::COMPANY_FREIGHT));
    let profit = gross_freight - total_costs;

    // Campo da viagem; na falta, o do faturamento.
    let text = |column: &str| trips.text(trip, column).or_else(|| invoices.text(invoice, column));
    let number = |column: &str| {
        let value = trips.get(trip, column).as_f64().or_else(|| invoices.get(invoice, column).as_f64());
        dec(value.unwrap_or(0.0))
    };

    Some(TripReport {
        num_conhec: wanted.to_string(),
        trip_date,
        plate,
        driver: text(col::DRIVER),
        origin: text(col::ORIGIN),
        destination: text(col::DESTINATION),
        distance_km: number(col::DISTANCE),
        client: invoices.text(invoice, col::CLIENT).or_else(|| trips.text(trip, col::CLIENT)),
        cargo: text(col::CARGO),
        weight_out: number(col::WEIGHT_OUT),
        weight_in: number(col::WEIGHT_IN),
        breakage_kg: number(col::BREAKAGE_KG),
        gross_freight,
        advances: number(col::ADVANCE),
        extra_charges: number(col::EXTRA_CHARGES),
        discounts: number(col::DISCOUNTS),
        cost_by_group,
        total_costs,
        profit,
        margin_percent: margin(profit, gross_freight),
    })
}

// ==========================================================
// Opções de filtro
// ==========================================================

/// "Todos" + filiais distintas de todas as tabelas, em ordem alfabética.
pub fn branches(tables: &[&Dataset]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for data in tables {
        for column in [col::BRANCH, col::BRANCH_SHORT] {
            if !data.has_column(column) {
                continue;
            }
            for r in 0..data.len() {
                if let Some(b) = data.text(r, column) {
                    if !unique.contains(&b) {
                        unique.push(b);
                    }
                }
            }
        }
    }
    unique.sort();
    std::iter::once(ALL.to_string()).chain(unique).collect()
}

pub fn plates_with_types(trips: &Dataset, expenses: &Dataset) -> Vec<PlateEntry> {
    let mut types: HashMap<String, &'static str> = HashMap::new();

    for r in 0..trips.len() {
        let Some(plate) = trips.text(r, col::PLATE) else { continue };
        let kind = match trips.text(r, col::FREIGHT_TYPE).as_deref() {
            Some("P") => OWN_VEHICLE_TYPE,
            Some("T") => "Terceiro",
            Some("A") => "Agregado",
            _ => continue,
        };
        types.insert(plate, kind);
    }

    for r in 0..expenses.len() {
        if expenses.text(r, col::OWN_VEHICLE).as_deref() != Some("F") {
            continue;
        }
        if let Some(plate) = expenses.text(r, col::PLATE) {
            types.entry(plate).or_insert("Apoio");
        }
    }

    let mut plates: Vec<PlateEntry> = types
        .into_iter()
        .map(|(plate, kind)| PlateEntry { plate, vehicle_type: kind.to_string() })
        .collect();
    plates.sort_by(|a, b| (&a.vehicle_type, &a.plate).cmp(&(&b.vehicle_type, &b.plate)));
    plates
}
