use std::sync::Arc;

use crate::kernel::component::{ServiceComponent, ServiceContext};
use crate::kernel::descriptor::{DescriptorTable, Phase, ServiceCatalog, ServiceDescriptor};
use crate::kernel::error::Error;
use crate::kernel::registry::SharedCapabilityRegistry;
use crate::kernel::tests::support::*;

fn context() -> ServiceContext {
    ServiceContext::new(SharedCapabilityRegistry::new(), Arc::new(primary_process()))
}

#[test]
fn test_from_names_tags_phases_from_allow_list() {
    let base = vec!["a".to_string(), "c".to_string()];
    let table = DescriptorTable::from_names(["a", "b", "c"], &base).unwrap();

    let phases: Vec<_> = table.iter().map(|d| (d.name(), d.phase())).collect();
    assert_eq!(
        phases,
        vec![("a", Phase::Base), ("b", Phase::Deferred), ("c", Phase::Base)]
    );
    assert_eq!(table.names(), vec!["a", "b", "c"]);
}

#[test]
fn test_allow_list_order_does_not_affect_table_order() {
    let base = vec!["c".to_string(), "x".to_string(), "a".to_string()];
    let table = DescriptorTable::from_names(["a", "b", "c"], &base).unwrap();
    assert_eq!(table.names(), vec!["a", "b", "c"]);
    assert_eq!(table.get(2).map(ServiceDescriptor::phase), Some(Phase::Base));
}

#[test]
fn test_empty_table_is_rejected() {
    let result = DescriptorTable::new(Vec::new());
    assert!(matches!(result, Err(Error::InvalidDescriptorTable { .. })));
}

#[test]
fn test_duplicate_names_are_rejected() {
    let result = DescriptorTable::from_names(["a", "b", "a"], &[]);
    match result {
        Err(Error::InvalidDescriptorTable { reason }) => assert!(reason.contains("'a'")),
        other => panic!("Expected InvalidDescriptorTable, got {:?}", other),
    }
}

#[test]
fn test_catalog_instantiates_registered_services() {
    let journal = journal();
    let catalog = catalog_for(&["a"], &journal);

    let service = catalog.instantiate("a", &context()).expect("factory should build");
    assert_eq!(service.name(), "a");
    assert!(catalog.contains("a"));
}

#[test]
fn test_catalog_unknown_name() {
    let catalog = ServiceCatalog::new();
    let err = catalog.instantiate("ghost", &context()).unwrap_err();
    assert!(matches!(err, Error::UnknownService { ref name } if name == "ghost"));
    assert!(err.is_configuration_error());
}

#[test]
fn test_catalog_verify_reports_first_missing_service() {
    let journal = journal();
    let catalog = catalog_for(&["a", "c"], &journal);
    let table = DescriptorTable::from_names(["a", "b", "c", "d"], &[]).unwrap();

    match catalog.verify(&table) {
        Err(Error::UnknownService { name }) => assert_eq!(name, "b"),
        other => panic!("Expected UnknownService, got {:?}", other),
    }
}

#[test]
fn test_factory_receives_injected_context() {
    let catalog = ServiceCatalog::new().with("probe", |ctx| {
        assert_eq!(ctx.process().process_name, "conductor");
        ctx.capabilities().put(Arc::new(7u8));
        let service: Arc<dyn ServiceComponent> =
            Arc::new(RecordingService::new("probe", &journal(), Behaviour::default()));
        Ok(service)
    });
    let ctx = context();

    catalog.instantiate("probe", &ctx).unwrap();

    assert_eq!(ctx.capabilities().get::<u8>().map(|v| *v), Some(7));
}
