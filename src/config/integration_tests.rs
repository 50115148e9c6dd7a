// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::backends::{DirectoryProvider, MemoryProvider};
    use crate::config::{load_project_config, DocumentKind, OutputFormat};
    use crate::errors::ErrorKind;
    use crate::resolve::TraitResolver;
    use crate::store::{collect_documents, lang, Store, Ty, TypeKind};
    use std::fs;

    const MAIN: &str = include_str!("../../samples/example1/main.yaml");
    const RECORDS: &str = include_str!("../../samples/example1/EmploymentRecord.yaml");
    const CSV: &str = include_str!("../../samples/example1/Csv.yaml");
    const EE2CSV: &str = include_str!("../../samples/example1/Ee2Csv.yaml");
    const MONEY: &str = include_str!("../../samples/example1/money.yaml");

    fn sample_provider() -> MemoryProvider {
        let mut provider = MemoryProvider::new("samples");
        provider
            .insert("example1::main", MAIN)
            .insert("example1::EmploymentRecord", RECORDS)
            .insert("example1::Csv", CSV)
            .insert("example1::Ee2Csv", EE2CSV)
            .insert("example1::money", MONEY);
        provider
    }

    /// The sample project loads from memory and every component gets a schema
    #[test]
    fn test_sample_project_loads() {
        let documents =
            collect_documents(&sample_provider(), &["example1::main".to_string()]).unwrap();
        assert_eq!(documents.len(), 5);
        assert_eq!(documents[0].kind(), DocumentKind::Main);

        let store = Store::load(documents).unwrap();
        for component in ["example1::EmploymentRecord", "example1::Csv", "example1::Ee2Csv"] {
            assert!(store.schema(component).is_some(), "{}", component);
        }

        let csv = store.schema("example1::Csv").unwrap();
        let names: Vec<_> = csv.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["path", "header", "write", "delimiter"]);
        assert_eq!(csv.checks.len(), 1);

        let records = store.type_decl("example1::EmploymentRecord").unwrap();
        assert!(matches!(records.kind, TypeKind::Struct { .. }));
        assert_eq!(
            records.field("salary").unwrap().ty,
            Ty::named("example1::money::Monetary", vec![])
        );
        assert_eq!(store.schema("example1::EmploymentRecord").unwrap().runtime_checks.len(), 2);
    }

    /// Source components produce themselves when they are declared by their columns
    #[test]
    fn test_sample_capabilities_are_synthesized() {
        let documents =
            collect_documents(&sample_provider(), &["example1::main".to_string()]).unwrap();
        let store = Store::load(documents).unwrap();
        let resolver = TraitResolver::new(&store);

        let records = Ty::named("example1::EmploymentRecord", vec![]);
        assert_eq!(
            resolver.project(&records, lang::SOURCE, lang::ITEM),
            Some(records.clone())
        );

        let ee2csv = Ty::named("example1::Ee2Csv", vec![]);
        let sink = crate::store::TraitRef::new(lang::SINK, vec![records.clone()]);
        assert!(resolver.implements(&ee2csv, &sink));

        let label = Ty::named("example1::money::Label", vec![]);
        assert_eq!(
            resolver.project(&label, lang::TRANSPARENT, lang::INNER),
            Some(Ty::std("String", vec![]))
        );
    }

    /// A project directory with settings is discovered and loaded from disk
    #[test]
    fn test_directory_project_with_settings() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("example1")).unwrap();
        for (file, text) in [
            ("main.yaml", MAIN),
            ("EmploymentRecord.yaml", RECORDS),
            ("Csv.yaml", CSV),
            ("Ee2Csv.yaml", EE2CSV),
            ("money.yaml", MONEY),
        ] {
            fs::write(docs.join("example1").join(file), text).unwrap();
        }
        let settings = dir.path().join("permute.toml");
        fs::write(
            &settings,
            "[project]\nroot = \"docs\"\nentries = [\"example1::main\"]\n\n[output]\nformat = \"yaml\"\n",
        )
        .unwrap();

        let config = load_project_config(&settings).unwrap();
        assert_eq!(config.output.format, OutputFormat::Yaml);

        let provider = DirectoryProvider::new(dir.path().join(&config.project.root));
        let documents = collect_documents(&provider, &config.project.entries).unwrap();
        let origins: Vec<_> = documents.iter().map(|d| d.origin.clone()).collect();
        assert!(origins.iter().any(|o| o.ends_with("Ee2Csv.yaml")));
        assert!(Store::load(documents).is_ok());
    }

    /// Imports naming nothing the provider holds are reported
    #[test]
    fn test_unknown_import_is_reported() {
        let mut provider = sample_provider();
        provider.insert(
            "example1::main",
            MAIN.replace("example1::*", "example2::Missing"),
        );
        let errors = collect_documents(&provider, &["example1::main".to_string()]).unwrap_err();
        assert_eq!(
            errors[0].kind,
            ErrorKind::UnknownImport {
                path: "example2::Missing".into()
            }
        );
    }

    /// Two identical unbounded impls are rejected at load time
    #[test]
    fn test_duplicate_impl_is_rejected() {
        let mut provider = sample_provider();
        provider.insert(
            "example1::extra",
            r#"
permute: { version: "0.1", type: struct, use: [example1::money::Monetary] }
impls:
  - for: Monetary
    trait: ConstEq
    methods:
      eq: self.cent == other.cent
"#,
        );
        let documents = collect_documents(
            &provider,
            &["example1::main".to_string(), "example1::extra".to_string()],
        )
        .unwrap();
        let errors = Store::load(documents).unwrap_err();
        assert!(errors
            .iter()
            .any(|d| matches!(d.kind, ErrorKind::DuplicateDeclaration { .. })));
    }

    /// A transparent impl that names another inner type contradicts the declaration
    #[test]
    fn test_conflicting_transparent_impl() {
        let mut provider = MemoryProvider::new("inline");
        provider.insert(
            "units",
            r#"
permute: { version: "0.1", type: struct }
types:
  Celsius: { inner: f64 }
impls:
  - for: Celsius
    trait: Transparent
    assoc: { Inner: u32 }
"#,
        );
        let documents = collect_documents(&provider, &["units".to_string()]).unwrap();
        let errors = Store::load(documents).unwrap_err();
        assert!(matches!(errors[0].kind, ErrorKind::InvalidDeclaration { .. }));
    }
}
