use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::analyze::HANDLER_EXPORT;
use crate::discover::Discovery;
use crate::model::{
    AnalyzerResult, AwsServiceUsage, Confidence, FileAnalysis, HandlerConfig, SdkVersion,
};

/// Fold the walk and every per-file analysis into the final document.
///
/// Collections keep walk order: declared dependencies before loaded ones,
/// and per-file entries in the order files were found.
pub fn aggregate(discovery: Discovery, files: Vec<FileAnalysis>) -> AnalyzerResult {
    let Discovery {
        tests,
        declared,
        root_main,
        mut warnings,
        ..
    } = discovery;

    let handler = select_handler(&files, root_main.as_deref());

    let mut environment = BTreeSet::new();
    let mut aws: BTreeMap<(String, SdkVersion), BTreeSet<String>> = BTreeMap::new();
    let mut dependencies = declared;
    let mut http_calls = Vec::new();

    for file in files {
        environment.extend(file.env_vars);
        for usage in file.aws {
            aws.entry((usage.service, usage.sdk_version))
                .or_default()
                .extend(usage.operations);
        }
        dependencies.extend(file.dependencies);
        http_calls.extend(file.http_calls);
        warnings.extend(file.warnings);
    }

    if handler.is_none() {
        let message = "no handler export found".to_string();
        warn!("{message}");
        warnings.push(message);
    }

    AnalyzerResult {
        environment: environment.into_iter().collect(),
        aws_services: aws
            .into_iter()
            .map(|((service, sdk_version), ops)| AwsServiceUsage {
                service,
                operations: ops.into_iter().collect(),
                sdk_version,
            })
            .collect(),
        tests,
        handler,
        warnings,
        dependencies,
        http_calls,
    }
}

/// Serialize the result; `pretty` indents it.
pub fn to_json(result: &AnalyzerResult, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
}

/// Best entry point: highest confidence, then shallowest path, then walk order.
fn select_handler(files: &[FileAnalysis], root_main: Option<&str>) -> Option<HandlerConfig> {
    files
        .iter()
        .enumerate()
        .flat_map(|(order, file)| {
            file.handlers.iter().map(move |candidate| {
                let confidence = if candidate.export != HANDLER_EXPORT {
                    Confidence::Low
                } else if Some(file.display_path.as_str()) == root_main
                    || is_root_index(&file.display_path)
                {
                    Confidence::High
                } else {
                    Confidence::Medium
                };
                (confidence, order, file, candidate)
            })
        })
        .min_by_key(|(confidence, order, file, candidate)| {
            (
                Reverse(*confidence),
                file.display_path.matches('/').count(),
                *order,
                candidate.line,
            )
        })
        .map(|(confidence, _, file, candidate)| HandlerConfig {
            file: file.display_path.clone(),
            export: candidate.export.clone(),
            kind: file.module.as_str().to_string(),
            confidence,
            source: candidate.source.to_string(),
        })
}

fn is_root_index(display_path: &str) -> bool {
    !display_path.contains('/')
        && display_path
            .split_once('.')
            .is_some_and(|(stem, _)| stem == "index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ModuleSystem;
    use crate::model::{
        AwsUsage, Dependency, DiscoveredTest, HandlerCandidate, HttpCallSite, ResolvedValue,
    };

    fn file(path: &str, module: ModuleSystem, handlers: &[(&str, &'static str)]) -> FileAnalysis {
        let mut fa = FileAnalysis::new(path, module);
        fa.handlers = handlers
            .iter()
            .map(|&(export, source)| HandlerCandidate {
                export: export.to_string(),
                source,
                line: 1,
            })
            .collect();
        fa
    }

    #[test]
    fn empty_result_keeps_field_order_and_omits_http_calls() {
        let result = aggregate(Discovery::default(), Vec::new());
        let json = to_json(&result, false).unwrap();
        assert_eq!(
            json,
            r#"{"environment":[],"awsServices":[],"tests":[],"handler":null,"warnings":["no handler export found"],"dependencies":[]}"#
        );
    }

    #[test]
    fn http_calls_serialize_with_components() {
        let mut fa = file("index.js", ModuleSystem::CommonJs, &[("handler", "commonjs-export")]);
        fa.http_calls.push(HttpCallSite {
            url: ResolvedValue::env(Some("API")),
            method: "GET".into(),
            location: "index.js:3".into(),
        });
        let result = aggregate(Discovery::default(), vec![fa]);
        let value: serde_json::Value =
            serde_json::from_str(&to_json(&result, true).unwrap()).unwrap();
        let call = &value["httpCalls"][0];
        assert_eq!(call["url"]["components"][0]["type"], "env");
        assert_eq!(call["url"]["components"][0]["envVar"], "API");
        assert_eq!(call["url"]["approximateText"], "${process.env.API}");
        assert_eq!(call["url"]["isFullyStatic"], false);
        assert_eq!(call["location"], "index.js:3");
        assert_eq!(value["handler"]["type"], "commonjs");
        assert_eq!(value["handler"]["confidence"], "high");
    }

    #[test]
    fn manifest_and_loaded_dependencies_are_not_deduplicated() {
        let mut fa = file("index.js", ModuleSystem::CommonJs, &[]);
        fa.dependencies.push(Dependency::loaded("left-pad"));
        fa.dependencies.push(Dependency::loaded("lodash"));
        let discovery = Discovery {
            declared: vec![Dependency::declared("lodash", "^4.0.0")],
            ..Discovery::default()
        };
        let result = aggregate(discovery, vec![fa]);
        assert_eq!(
            result.dependencies,
            vec![
                Dependency::declared("lodash", "^4.0.0"),
                Dependency::loaded("left-pad"),
                Dependency::loaded("lodash"),
            ]
        );
        let json = to_json(&result, false).unwrap();
        assert!(json.contains(r#"{"name":"left-pad"}"#));
    }

    #[test]
    fn environment_is_sorted_union() {
        let mut a = file("a.js", ModuleSystem::CommonJs, &[]);
        a.env_vars.extend(["TABLE".to_string(), "API".to_string()]);
        let mut b = file("b.js", ModuleSystem::CommonJs, &[]);
        b.env_vars.insert("API".to_string());
        b.env_vars.insert("BUCKET".to_string());
        let result = aggregate(Discovery::default(), vec![a, b]);
        assert_eq!(result.environment, vec!["API", "BUCKET", "TABLE"]);
    }

    #[test]
    fn aws_usages_group_by_service_and_version() {
        let usage = |service: &str, version, ops: &[&str]| AwsUsage {
            service: service.into(),
            sdk_version: version,
            operations: ops.iter().map(|o| o.to_string()).collect(),
        };
        let mut a = file("a.js", ModuleSystem::CommonJs, &[]);
        a.aws = vec![usage("s3", SdkVersion::V3, &["PutObject"])];
        let mut b = file("b.js", ModuleSystem::CommonJs, &[]);
        b.aws = vec![
            usage("s3", SdkVersion::V3, &["GetObject", "PutObject"]),
            usage("s3", SdkVersion::V2, &["getObject"]),
        ];
        let result = aggregate(Discovery::default(), vec![a, b]);
        assert_eq!(
            result.aws_services,
            vec![
                AwsServiceUsage {
                    service: "s3".into(),
                    operations: vec!["getObject".into()],
                    sdk_version: SdkVersion::V2,
                },
                AwsServiceUsage {
                    service: "s3".into(),
                    operations: vec!["GetObject".into(), "PutObject".into()],
                    sdk_version: SdkVersion::V3,
                },
            ]
        );
        let json = to_json(&result, false).unwrap();
        assert!(json.contains(r#""sdkVersion":"v3""#));
    }

    #[test]
    fn handler_prefers_manifest_main_over_shallow_file() {
        let files = vec![
            file("lib.js", ModuleSystem::CommonJs, &[("handler", "commonjs-export")]),
            file("src/app.mjs", ModuleSystem::EsModule, &[("handler", "esm-export")]),
        ];
        let discovery = Discovery {
            root_main: Some("src/app.mjs".into()),
            ..Discovery::default()
        };
        let handler = aggregate(discovery, files).handler.unwrap();
        assert_eq!(handler.file, "src/app.mjs");
        assert_eq!(handler.kind, "module");
        assert_eq!(handler.confidence, Confidence::High);
        assert_eq!(handler.source, "esm-export");
    }

    #[test]
    fn handler_ties_break_on_depth_then_order() {
        let files = vec![
            file("src/deep/a.js", ModuleSystem::CommonJs, &[("handler", "commonjs-export")]),
            file("src/b.js", ModuleSystem::CommonJs, &[("handler", "commonjs-export")]),
            file("src/c.js", ModuleSystem::CommonJs, &[("handler", "commonjs-export")]),
        ];
        let handler = aggregate(Discovery::default(), files).handler.unwrap();
        assert_eq!(handler.file, "src/b.js");
        assert_eq!(handler.confidence, Confidence::Medium);
    }

    #[test]
    fn default_export_is_low_confidence() {
        let files = vec![file("index.ts", ModuleSystem::EsModule, &[("default", "esm-export")])];
        let result = aggregate(Discovery::default(), files);
        let handler = result.handler.unwrap();
        assert_eq!(handler.export, "default");
        assert_eq!(handler.confidence, Confidence::Low);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn warnings_keep_walk_then_file_order() {
        let mut fa = file("index.js", ModuleSystem::CommonJs, &[("handler", "commonjs-export")]);
        fa.warnings.push("index.js: dynamic".into());
        let discovery = Discovery {
            tests: vec![DiscoveredTest {
                name: "index.test.js".into(),
                fixture: "jest".into(),
            }],
            warnings: vec!["umd/lib.js: unrecognized".into()],
            ..Discovery::default()
        };
        let result = aggregate(discovery, vec![fa]);
        assert_eq!(result.warnings, vec!["umd/lib.js: unrecognized", "index.js: dynamic"]);
        assert_eq!(result.tests.len(), 1);
    }

    #[test]
    fn root_index_detection() {
        assert!(is_root_index("index.js"));
        assert!(is_root_index("index.mjs"));
        assert!(!is_root_index("src/index.js"));
        assert!(!is_root_index("indexer.js"));
    }
}
