// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::backends::MemoryProvider;
    use crate::config::Document;
    use crate::engine::{bind, bind_documents, ConstructionPlan, ExecutionGraph};
    use crate::errors::{Diagnostic, ErrorKind};
    use crate::expr::Value;
    use crate::schema::ParamOrigin;
    use crate::store::{collect_documents, Store, Ty};
    use std::sync::Arc;

    const MAIN: &str = include_str!("../../samples/example1/main.yaml");
    const RECORDS: &str = include_str!("../../samples/example1/EmploymentRecord.yaml");
    const CSV: &str = include_str!("../../samples/example1/Csv.yaml");
    const EE2CSV: &str = include_str!("../../samples/example1/Ee2Csv.yaml");
    const MONEY: &str = include_str!("../../samples/example1/money.yaml");

    fn provider() -> MemoryProvider {
        let mut provider = MemoryProvider::new("samples");
        provider
            .insert("example1::main", MAIN)
            .insert("example1::EmploymentRecord", RECORDS)
            .insert("example1::Csv", CSV)
            .insert("example1::Ee2Csv", EE2CSV)
            .insert("example1::money", MONEY);
        provider
    }

    /// Load the samples plus extra process documents; returns the store and those documents.
    fn load(mains: &[(&str, &str)]) -> (Arc<Store>, Vec<Document>) {
        let mut provider = provider();
        for (module, text) in mains {
            provider.insert(*module, *text);
        }
        let mut entries = vec!["example1::main".to_string()];
        entries.extend(mains.iter().map(|(module, _)| module.to_string()));
        let documents = collect_documents(&provider, &entries).unwrap();
        let wanted: Vec<Document> = entries
            .iter()
            .filter_map(|e| documents.iter().find(|d| &d.module == e).cloned())
            .collect();
        (Arc::new(Store::load(documents).unwrap()), wanted)
    }

    fn bind_one(main: &str) -> Result<ExecutionGraph, Vec<Diagnostic>> {
        let (store, documents) = load(&[("tests::main", main)]);
        bind(&store, &documents[1])
    }

    fn process(lets: &str) -> String {
        format!(
            "permute: {{ version: \"0.1\", type: main, use: [\"example1::*\", \"example1::money::Monetary\"] }}\n{}",
            lets
        )
    }

    /// The sample payroll binds into records, csv, sink
    #[test]
    fn test_sample_payroll_binds() {
        let (store, documents) = load(&[]);
        let graph = bind(&store, &documents[0]).unwrap();

        assert_eq!(graph.name, "payroll");
        assert_eq!(graph.order(), vec!["records", "csv", "sink"]);
        assert_eq!(graph.step("sink").unwrap().depends_on, vec!["records", "csv"]);
        assert_eq!(
            graph.pipes[0].item,
            Ty::named("example1::EmploymentRecord", vec![])
        );

        let ConstructionPlan::Component { params, .. } = &graph.step("csv").unwrap().plan else {
            panic!("csv should be a component");
        };
        let delimiter = params.iter().find(|p| p.name == "delimiter").unwrap();
        assert_eq!(delimiter.origin, ParamOrigin::Default);
        assert_eq!(delimiter.value, Value::Str(",".into()));

        let ConstructionPlan::Component { params, .. } = &graph.step("sink").unwrap().plan else {
            panic!("sink should be a component");
        };
        let csv = params.iter().find(|p| p.name == "csv").unwrap();
        assert!(!csv.const_evaluated);
        assert_eq!(csv.value.refs(), vec!["csv"]);
    }

    /// The execution graph serializes for the external executor
    #[test]
    fn test_execution_graph_serializes() {
        let (store, documents) = load(&[]);
        let graph = bind(&store, &documents[0]).unwrap();

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["steps"][1]["name"], "csv");
        assert_eq!(json["steps"][1]["plan"]["kind"], "component");
        assert_eq!(json["steps"][1]["ty"], "example1::Csv<example1::EmploymentRecord>");

        let yaml = serde_yaml::to_string(&graph).unwrap();
        assert!(yaml.contains("payroll"));
    }

    /// Header of length 2 needs exactly 2 writers
    #[test]
    fn test_cross_field_check() {
        let three_writers = process(
            r#"
let:
  csv:
    Csv<EmploymentRecord>:
      path: '"a.csv"'
      header: ['"id"', '"hired"']
      write: ["|r| r.employee_id", "|r| r.hire_date", "|r| r.salary.fmt()"]
"#,
        );
        let errors = bind_one(&three_writers).unwrap_err();
        assert_eq!(
            errors[0].kind,
            ErrorKind::CrossFieldCheckViolation {
                predicate: "header.len() == write.len()".into()
            }
        );

        let two_writers = three_writers.replace(", \"|r| r.salary.fmt()\"", "");
        assert!(bind_one(&two_writers).is_ok());
    }

    /// A binding of the wrong component type cannot be handed to a parameter
    #[test]
    fn test_reference_of_wrong_type() {
        let main = process(
            r#"
let:
  csv: { "Csv<String>": { path: '"x.csv"' } }
  sink: { Ee2Csv: { csv: csv } }
"#,
        );
        let errors = bind_one(&main).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0].kind {
            ErrorKind::PipelineTypeError { producer, consumer, .. } => {
                assert_eq!(producer, "csv");
                assert_eq!(consumer, "sink");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    /// a -> b -> c -> a is a cycle; without c -> a the chain orders dependencies first
    #[test]
    fn test_cycle_and_its_removal() {
        let cyclic = process(
            r#"
let:
  a: { Monetary: { dollar: b.dollar, cent: 1 } }
  b: { Monetary: { dollar: c.dollar, cent: 2 } }
  c: { Monetary: { dollar: a.dollar, cent: 3 } }
"#,
        );
        let errors = bind_one(&cyclic).unwrap_err();
        assert_eq!(
            errors[0].kind,
            ErrorKind::CyclicBinding {
                names: vec!["a".into(), "b".into(), "c".into()]
            }
        );

        let acyclic = cyclic.replace("dollar: a.dollar", "dollar: 5");
        let graph = bind_one(&acyclic).unwrap();
        assert_eq!(graph.order(), vec!["c", "b", "a"]);
    }

    /// Pipes into components that take other items are rejected
    #[test]
    fn test_pipe_item_mismatch() {
        let main = process(
            r#"
let:
  records: { EmploymentRecord: {} }
  out: { "Csv<String>": { path: '"x.csv"' } }
pipe: [records -> out]
"#,
        );
        let errors = bind_one(&main).unwrap_err();
        assert!(matches!(errors[0].kind, ErrorKind::PipelineTypeError { .. }));
    }

    /// Documents bound together keep their order and their own outcomes
    #[tokio::test]
    async fn test_documents_bind_concurrently() {
        let broken = process("let:\n  csv: { \"Csv<String>\": { path: '\"\"' } }\n");
        let (store, documents) = load(&[("tests::broken", broken.as_str())]);

        let results = bind_documents(Arc::clone(&store), documents).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].module, "example1::main");
        assert!(results[0].is_ok());
        assert_eq!(results[1].module, "tests::broken");
        let errors = results[1].result.as_ref().unwrap_err();
        assert!(matches!(errors[0].kind, ErrorKind::CheckViolation { .. }));
    }

    /// Binding the same document twice gives the same graph
    #[tokio::test]
    async fn test_binding_is_deterministic() {
        let (store, documents) = load(&[]);
        let twice = vec![documents[0].clone(), documents[0].clone()];
        let results = bind_documents(store, twice).await;
        assert_eq!(results[0].result, results[1].result);
    }
}
