use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tree_sitter::Node;

use crate::model::{AwsUsage, SdkVersion};
use crate::util::{txt, unwrap_expression};

const V2_MODULE: &str = "aws-sdk";
const V2_CLIENTS_PREFIX: &str = "aws-sdk/clients/";
const V3_CLIENT_PREFIX: &str = "@aws-sdk/client-";
const V3_DOCUMENT_MODULE: &str = "@aws-sdk/lib-dynamodb";

/// Tracks AWS SDK clients and the operations invoked on them within one file.
#[derive(Debug, Default)]
pub struct AwsCollector {
    /// Local names bound to the whole v2 SDK (`const AWS = require("aws-sdk")`).
    sdk_roots: HashSet<String>,
    /// Local names bound to a v2 service class, mapped to the service.
    client_classes: HashMap<String, String>,
    /// Local names bound to a constructed v2 client, mapped to the service.
    clients: HashMap<String, String>,
    usages: BTreeMap<(String, SdkVersion), BTreeSet<String>>,
}

impl AwsCollector {
    /// Record the service a loaded module stands for, if any.
    pub fn module_loaded(&mut self, module: &str) {
        if let Some(service) = v3_service(module) {
            self.record(&service, SdkVersion::V3);
        } else if let Some(service) = module.strip_prefix(V2_CLIENTS_PREFIX) {
            self.record(&service.to_ascii_lowercase(), SdkVersion::V2);
        }
    }

    /// Record the names a module load binds.
    ///
    /// `bindings` are `(imported, local)` pairs; an empty imported name means
    /// the local name holds the whole module.
    pub fn module_bound(&mut self, module: &str, bindings: &[(String, String)]) {
        if let Some(service) = v3_service(module) {
            let ops = self.record(&service, SdkVersion::V3);
            for (imported, _) in bindings {
                if let Some(op) = command_operation(imported) {
                    ops.insert(op.to_string());
                }
            }
        } else if module == V2_MODULE {
            for (imported, local) in bindings {
                if imported.is_empty() {
                    self.sdk_roots.insert(local.clone());
                } else {
                    self.client_classes
                        .insert(local.clone(), imported.to_ascii_lowercase());
                }
            }
        } else if let Some(service) = module.strip_prefix(V2_CLIENTS_PREFIX) {
            for (imported, local) in bindings {
                if imported.is_empty() {
                    self.client_classes
                        .insert(local.clone(), service.to_ascii_lowercase());
                }
            }
        }
    }

    /// Record a v2 client construction such as `new AWS.S3()`, returning its service.
    pub fn constructed(&mut self, new_expr: Node, src: &[u8]) -> Option<String> {
        let ctor = unwrap_expression(new_expr.child_by_field_name("constructor")?);
        let service = match ctor.kind() {
            "identifier" => self.client_classes.get(txt(ctor, src)).cloned(),
            "member_expression" => self.member_service(ctor, src),
            _ => None,
        }?;
        self.record(&service, SdkVersion::V2);
        Some(service)
    }

    /// Remember that `name` holds the client built by `new_expr`.
    pub fn bind_client(&mut self, name: &str, new_expr: Node, src: &[u8]) {
        if let Some(service) = self.constructed(new_expr, src) {
            self.clients.insert(name.to_string(), service);
        }
    }

    /// Record `client.operation(...)` on a known v2 client.
    pub fn method_called(&mut self, call: Node, src: &[u8]) {
        let Some(callee) = call
            .child_by_field_name("function")
            .map(unwrap_expression)
            .filter(|c| c.kind() == "member_expression")
        else {
            return;
        };
        let (Some(object), Some(property)) = (
            callee.child_by_field_name("object").map(unwrap_expression),
            callee.child_by_field_name("property"),
        ) else {
            return;
        };
        if object.kind() != "identifier" {
            return;
        }
        if let Some(service) = self.clients.get(txt(object, src)).cloned() {
            self.record(&service, SdkVersion::V2)
                .insert(txt(property, src).to_string());
        }
    }

    pub fn finish(self) -> Vec<AwsUsage> {
        self.usages
            .into_iter()
            .map(|((service, sdk_version), operations)| AwsUsage {
                service,
                sdk_version,
                operations,
            })
            .collect()
    }

    fn record(&mut self, service: &str, version: SdkVersion) -> &mut BTreeSet<String> {
        self.usages
            .entry((service.to_string(), version))
            .or_default()
    }

    /// Service of `AWS.S3` or `AWS.DynamoDB.DocumentClient`: the member right
    /// below the SDK root, or the class a root name was bound to.
    fn member_service(&self, member: Node, src: &[u8]) -> Option<String> {
        let mut current = member;
        loop {
            let object = unwrap_expression(current.child_by_field_name("object")?);
            match object.kind() {
                "identifier" => {
                    let root = txt(object, src);
                    if self.sdk_roots.contains(root) {
                        let property = current.child_by_field_name("property")?;
                        return Some(txt(property, src).to_ascii_lowercase());
                    }
                    return self.client_classes.get(root).cloned();
                }
                "member_expression" => current = object,
                _ => return None,
            }
        }
    }
}

fn v3_service(module: &str) -> Option<String> {
    if module == V3_DOCUMENT_MODULE {
        return Some("dynamodb".to_string());
    }
    module
        .strip_prefix(V3_CLIENT_PREFIX)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn command_operation(name: &str) -> Option<&str> {
    name.strip_suffix("Command").filter(|op| !op.is_empty())
}
