//! Filter to predicate translation.

use crate::catalog::{DataType, FieldCatalog, FieldDescriptor, FilterKind};
use crate::error::{ValidationError, ValidationResult};
use crate::request::{
    Filter, IdFilter, IdOperator, NumberFilter, NumberOperator, TagFilter, TimeFilter,
    TimeOperator,
};
use crate::sql::dialect::LIKE_ESCAPE;
use crate::sql::{any_of, lit_float, lit_int, lit_str, lit_timestamp, table_col, Expr, ExprExt};

/// Predicate for one normalized filter. Inert filters yield `None`.
pub(crate) fn predicate(catalog: &FieldCatalog, filter: &Filter) -> ValidationResult<Option<Expr>> {
    if filter.is_inert() {
        return Ok(None);
    }
    match filter {
        Filter::Id(f) | Filter::String(f) | Filter::Enum(f) => id_predicate(catalog, f),
        Filter::Number(f) => number_predicate(catalog, f).map(Some),
        Filter::Time(f) => time_predicate(catalog, f).map(Some),
        Filter::Tag(f) => tag_predicate(catalog, f).map(Some),
        Filter::Label(f) => Err(ValidationError::filter(
            &f.name,
            "label filters must be resolved before planning",
        )),
    }
}

/// LIKE pattern matching `value` literally anywhere in the column.
fn substring_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn column(catalog: &FieldCatalog, field: &FieldDescriptor) -> Expr {
    table_col(&catalog.table().alias, &field.column)
}

fn id_predicate(catalog: &FieldCatalog, filter: &IdFilter) -> ValidationResult<Option<Expr>> {
    let field = catalog.describe(&filter.field)?;
    if field.data_type != DataType::String {
        return Err(ValidationError::filter(&field.name, "expected a string field"));
    }
    let c = column(catalog, field);
    let values = || filter.values.iter().map(|v| lit_str(v)).collect::<Vec<_>>();

    let expr = match (field.filter_kind, filter.operator) {
        (_, IdOperator::NotNull) => Some(c.is_not_null()),
        (FilterKind::Simple, IdOperator::Equals | IdOperator::In) => Some(c.in_list(values())),
        (FilterKind::Simple, IdOperator::NotIn) => Some(c.not_in_list(values())),
        (FilterKind::Simple, IdOperator::Like) => any_of(
            filter
                .values
                .iter()
                .map(|v| c.clone().like(substring_pattern(v)))
                .collect(),
        ),
        (FilterKind::Array, IdOperator::Equals | IdOperator::In) => Some(c.contains_any(values())),
        (FilterKind::Array, IdOperator::NotIn) => Some(c.contains_none(values())),
        (FilterKind::Array, IdOperator::Like) => {
            return Err(ValidationError::filter(
                &field.name,
                "LIKE is not supported on array fields",
            ))
        }
        (FilterKind::KeyValue, _) => {
            return Err(ValidationError::filter(
                &field.name,
                "key/value fields are filtered with tag or label filters",
            ))
        }
    };
    Ok(expr)
}

fn number_literal(field: &FieldDescriptor, value: f64) -> ValidationResult<Expr> {
    if !value.is_finite() {
        return Err(ValidationError::filter(&field.name, "value must be finite"));
    }
    Ok(match field.data_type {
        DataType::Integer | DataType::Long if value.fract() == 0.0 => lit_int(value as i64),
        _ => lit_float(value),
    })
}

fn number_predicate(catalog: &FieldCatalog, filter: &NumberFilter) -> ValidationResult<Expr> {
    let field = catalog.describe(&filter.field)?;
    if !field.data_type.is_numeric() {
        return Err(ValidationError::filter(&field.name, "expected a numeric field"));
    }
    let c = column(catalog, field);
    let values = filter
        .values
        .iter()
        .map(|v| number_literal(field, *v))
        .collect::<ValidationResult<Vec<_>>>()?;

    let single = |values: Vec<Expr>| -> ValidationResult<Expr> {
        match <[Expr; 1]>::try_from(values) {
            Ok([v]) => Ok(v),
            Err(_) => Err(ValidationError::filter(
                &field.name,
                format!("{:?} takes exactly one value", filter.operator),
            )),
        }
    };

    Ok(match filter.operator {
        NumberOperator::In => c.in_list(values),
        NumberOperator::Equals if values.len() > 1 => c.in_list(values),
        NumberOperator::Equals => c.eq(single(values)?),
        NumberOperator::NotEquals if values.len() > 1 => c.not_in_list(values),
        NumberOperator::NotEquals => c.ne(single(values)?),
        NumberOperator::LessThan => c.lt(single(values)?),
        NumberOperator::LessThanOrEquals => c.lte(single(values)?),
        NumberOperator::GreaterThan => c.gt(single(values)?),
        NumberOperator::GreaterThanOrEquals => c.gte(single(values)?),
    })
}

fn time_predicate(catalog: &FieldCatalog, filter: &TimeFilter) -> ValidationResult<Expr> {
    let field = catalog.describe(&filter.field)?;
    if field.data_type != DataType::Timestamp {
        return Err(ValidationError::filter(&field.name, "expected a timestamp field"));
    }
    let c = column(catalog, field);
    let bound = lit_timestamp(filter.value);
    Ok(match filter.operator {
        TimeOperator::After => c.gte(bound),
        TimeOperator::Before => c.lte(bound),
    })
}

fn tag_predicate(catalog: &FieldCatalog, filter: &TagFilter) -> ValidationResult<Expr> {
    let tags = match catalog.tag_field() {
        Some(name) if catalog.own_entity() == Some(filter.entity_type) => catalog.describe(name)?,
        _ => {
            return Err(ValidationError::filter(
                &filter.tag_name,
                format!("{} tag filters must be resolved before planning", filter.entity_type),
            ))
        }
    };
    let value = column(catalog, tags).key(&filter.tag_name);
    Ok(match &filter.tag_value {
        Some(v) => value.eq(v.as_str()),
        None => value.is_not_null(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{billing, deployment, TagEntityType};
    use crate::sql::Dialect;

    fn render(catalog: &FieldCatalog, filter: Filter) -> String {
        predicate(catalog, &filter)
            .unwrap()
            .unwrap()
            .to_tokens()
            .serialize(Dialect::Postgres)
    }

    fn number(field: &str, operator: NumberOperator, values: &[f64]) -> Filter {
        Filter::Number(NumberFilter {
            field: field.into(),
            operator,
            values: values.to_vec(),
        })
    }

    #[test]
    fn test_id_filters_on_simple_fields() {
        let catalog = billing();
        assert_eq!(
            render(&catalog, Filter::id_in("clusterid", &["c1", "c2"])),
            r#""t0"."clusterid" IN ('c1', 'c2')"#
        );
        assert_eq!(
            render(
                &catalog,
                Filter::Id(IdFilter::new("instancetype", IdOperator::NotIn, &["K8S_PV"]))
            ),
            r#""t0"."instancetype" NOT IN ('K8S_PV')"#
        );
        assert_eq!(
            render(
                &catalog,
                Filter::String(IdFilter::new("namespace", IdOperator::Like, &["kube", "prod"]))
            ),
            r#"("t0"."namespace" LIKE '%kube%' ESCAPE '\' OR "t0"."namespace" LIKE '%prod%' ESCAPE '\')"#
        );
        assert_eq!(
            render(
                &catalog,
                Filter::Id(IdFilter::new("workloadtype", IdOperator::NotNull, &[]))
            ),
            r#""t0"."workloadtype" IS NOT NULL"#
        );
    }

    #[test]
    fn test_like_matches_wildcards_literally() {
        let catalog = billing();
        let filter = Filter::String(IdFilter::new("namespace", IdOperator::Like, &["a_b%"]));
        assert_eq!(
            render(&catalog, filter.clone()),
            r#""t0"."namespace" LIKE '%a\_b\%%' ESCAPE '\'"#
        );

        let bq = predicate(&catalog, &filter)
            .unwrap()
            .unwrap()
            .to_tokens_for_dialect(Dialect::BigQuery)
            .serialize(Dialect::BigQuery);
        assert_eq!(bq, r"`t0`.`namespace` LIKE '%a\\_b\\%%'");

        let sql = format!(
            r#"SELECT 1 FROM "billing_data" AS "t0" WHERE {}"#,
            render(&catalog, filter)
        );
        crate::sql::test_utils::validate_sql(&sql, Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_id_filters_on_array_fields() {
        let catalog = deployment();
        assert_eq!(
            render(&catalog, Filter::id_in("serviceid", &["s1"])),
            r#""t0"."services" && ARRAY['s1']"#
        );
        assert_eq!(
            render(
                &catalog,
                Filter::Id(IdFilter::new("envid", IdOperator::NotIn, &["e1"]))
            ),
            r#"NOT ("t0"."environments" && ARRAY['e1'])"#
        );
        let err = predicate(
            &catalog,
            &Filter::Id(IdFilter::new("serviceid", IdOperator::Like, &["s"])),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFilter { .. }));
    }

    #[test]
    fn test_inert_filter_has_no_predicate() {
        let catalog = billing();
        assert!(predicate(&catalog, &Filter::id_in("clusterid", &[]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_number_filters() {
        let catalog = deployment();
        assert_eq!(
            render(&catalog, number("duration", NumberOperator::GreaterThan, &[60.0])),
            r#""t0"."duration" > 60"#
        );
        assert_eq!(
            render(&catalog, number("duration", NumberOperator::Equals, &[1.0, 2.0])),
            r#""t0"."duration" IN (1, 2)"#
        );
        let billing = billing();
        assert_eq!(
            render(&billing, number("cost", NumberOperator::LessThanOrEquals, &[2.5])),
            r#""t0"."cost" <= 2.5"#
        );
    }

    #[test]
    fn test_number_filter_rejections() {
        let catalog = deployment();
        for filter in [
            number("duration", NumberOperator::LessThan, &[1.0, 2.0]),
            number("duration", NumberOperator::Equals, &[f64::NAN]),
            number("status", NumberOperator::Equals, &[1.0]),
        ] {
            assert!(matches!(
                predicate(&catalog, &filter),
                Err(ValidationError::UnsupportedFilter { .. })
            ));
        }
    }

    #[test]
    fn test_time_filters() {
        let catalog = deployment();
        assert_eq!(
            render(&catalog, Filter::after("starttime", 1_700_000_000_000)),
            r#""t0"."starttime" >= TIMESTAMP '2023-11-14 22:13:20.000'"#
        );
        assert!(matches!(
            predicate(&catalog, &Filter::after("duration", 0)),
            Err(ValidationError::UnsupportedFilter { .. })
        ));
        assert!(matches!(
            predicate(&catalog, &Filter::after("created", 0)),
            Err(ValidationError::UnknownField(_))
        ));
    }

    #[test]
    fn test_own_entity_tag_filter() {
        let catalog = deployment();
        let filter = Filter::Tag(TagFilter {
            entity_type: TagEntityType::Deployment,
            tag_name: "team".into(),
            tag_value: Some("core".into()),
        });
        assert_eq!(render(&catalog, filter), r#"("t0"."tags" -> 'team') = 'core'"#);

        let unresolved = Filter::Tag(TagFilter {
            entity_type: TagEntityType::Application,
            tag_name: "team".into(),
            tag_value: None,
        });
        assert!(predicate(&catalog, &unresolved).is_err());
    }
}
