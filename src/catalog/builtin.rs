//! Built-in catalogs for the deployment and billing fact tables.

use std::collections::HashMap;

use super::{
    CatalogDef, DataType, FieldCatalog, FieldDescriptor, FilterKind, ImpliedFilter, TableSpec,
    TagEntityType, TimeFields,
};
use crate::request::{Filter, IdFilter, IdOperator};

fn string(name: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, name, DataType::String)
}

fn array(name: &str, column: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, column, DataType::String).with_kind(FilterKind::Array)
}

fn key_value(name: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, name, DataType::KeyValue).with_kind(FilterKind::KeyValue)
}

fn timestamp(name: &str, column: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, column, DataType::Timestamp)
}

fn number(name: &str, data_type: DataType) -> FieldDescriptor {
    FieldDescriptor::new(name, name, data_type)
}

fn exclude(group_by: &str, field: &str, values: &[&str]) -> ImpliedFilter {
    ImpliedFilter {
        group_by: group_by.into(),
        filter: Filter::Id(IdFilter::new(field, IdOperator::NotIn, values)),
    }
}

/// Catalog for the deployment statistics table (one row per execution).
///
/// Services, environments, cloud providers and workflows are arrays: an
/// execution can touch several of each.
pub fn deployment() -> FieldCatalog {
    let def = CatalogDef {
        name: "deployment".into(),
        table: TableSpec {
            schema: None,
            name: "deployment".into(),
            alias: "t0".into(),
        },
        account_field: "accountid".into(),
        time: TimeFields {
            start: "starttime".into(),
            end: "endtime".into(),
        },
        own_entity: Some(TagEntityType::Deployment),
        tag_field: Some("tags".into()),
        label_field: None,
        tag_targets: HashMap::from([
            (TagEntityType::Application, "appid".into()),
            (TagEntityType::Service, "serviceid".into()),
            (TagEntityType::Environment, "envid".into()),
        ]),
        implied_filters: Vec::new(),
        fields: vec![
            string("executionid"),
            string("accountid"),
            string("appid"),
            string("status"),
            string("pipeline"),
            string("triggerid"),
            string("triggeredby"),
            array("serviceid", "services"),
            array("envid", "environments"),
            array("envtype", "envtypes"),
            array("cloudproviderid", "cloudproviders"),
            array("workflowid", "workflows"),
            timestamp("starttime", "starttime"),
            timestamp("endtime", "endtime"),
            number("duration", DataType::Long),
            number("rollback_duration", DataType::Long),
            number("instances_deployed", DataType::Integer),
            key_value("tags"),
        ],
    };
    checked(def)
}

/// Catalog for the cluster billing table (one row per instance per period).
pub fn billing() -> FieldCatalog {
    let def = CatalogDef {
        name: "billing".into(),
        table: TableSpec {
            schema: None,
            name: "billing_data".into(),
            alias: "t0".into(),
        },
        account_field: "accountid".into(),
        time: TimeFields {
            start: "starttime".into(),
            end: "endtime".into(),
        },
        own_entity: None,
        tag_field: None,
        label_field: Some("labels".into()),
        tag_targets: HashMap::from([
            (TagEntityType::Application, "appid".into()),
            (TagEntityType::Service, "serviceid".into()),
            (TagEntityType::Environment, "envid".into()),
            (TagEntityType::Cluster, "clusterid".into()),
            (TagEntityType::Workload, "workloadname".into()),
        ]),
        implied_filters: vec![
            exclude("namespace", "instancetype", &["K8S_PV"]),
            exclude("workloadname", "instancetype", &["K8S_PV"]),
            ImpliedFilter {
                group_by: "workloadname".into(),
                filter: Filter::Id(IdFilter::new("workloadtype", IdOperator::NotNull, &[])),
            },
            exclude("clusterid", "instancetype", &["CLUSTER_UNALLOCATED"]),
        ],
        fields: vec![
            string("accountid"),
            string("clusterid"),
            string("clustertype"),
            string("namespace"),
            string("workloadname"),
            string("workloadtype"),
            string("instancetype"),
            string("instanceid"),
            string("appid"),
            string("serviceid"),
            string("envid"),
            string("cloudproviderid"),
            timestamp("starttime", "starttime"),
            // The table is bucketed on start time only.
            timestamp("endtime", "starttime"),
            number("cost", DataType::Double),
            number("idlecost", DataType::Double),
            number("unallocatedcost", DataType::Double),
            number("cpurequest", DataType::Double),
            number("memoryrequest", DataType::Double),
            number("podcount", DataType::Long),
            key_value("labels"),
        ],
    };
    checked(def)
}

// Skips validation; `test_builtin_catalogs_validate` covers the built-ins.
fn checked(def: CatalogDef) -> FieldCatalog {
    let index = def
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();
    FieldCatalog { def, index }
}
