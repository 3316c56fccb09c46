use parser::{FromYaml, YamlError, YamlValue};
use std::collections::HashMap;

use super::types::*;

fn field<T: FromYaml>(value: &YamlValue, key: &str, default: T) -> Result<T, YamlError> {
    match value.get(key) {
        Some(v) => T::from_yaml(v),
        None => Ok(default),
    }
}

impl FromYaml for RouteConfig {
    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError> {
        if !matches!(value, YamlValue::Map(_)) {
            return Err(YamlError::Generic("Expected a Map".into()));
        }
        let defaults = RouteConfig::default();
        Ok(RouteConfig {
            path: String::from_yaml_opt(value.get("path"), "path")?,
            methods: field(value, "methods", defaults.methods)?,
            root: field(value, "root", defaults.root)?,
            default_file: field(value, "default_file", defaults.default_file)?,
            autoindex: field(value, "autoindex", defaults.autoindex)?,
            redirection: Option::from_yaml_opt(value.get("redirection"), "redirection")?,
            redirection_code: field(value, "redirection_code", defaults.redirection_code)?,
            upload_pass: Option::from_yaml_opt(value.get("upload_pass"), "upload_pass")?,
            cgi_ext: Option::from_yaml_opt(value.get("cgi_ext"), "cgi_ext")?,
        })
    }
}

impl FromYaml for ServerConfig {
    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError> {
        if !matches!(value, YamlValue::Map(_)) {
            return Err(YamlError::Generic("Expected a Map".into()));
        }
        let defaults = ServerConfig::default();
        Ok(ServerConfig {
            host: field(value, "host", defaults.host)?,
            ports: field(value, "ports", defaults.ports)?,
            server_name: field(value, "server_name", defaults.server_name)?,
            default_server: field(value, "default_server", defaults.default_server)?,
            error_pages: field(value, "error_pages", HashMap::new())?,
            client_max_body_size: field(
                value,
                "client_max_body_size",
                defaults.client_max_body_size,
            )?,
            routes: field(value, "routes", Vec::new())?,
        })
    }
}

impl FromYaml for AppConfig {
    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError> {
        if !matches!(value, YamlValue::Map(_)) {
            return Err(YamlError::Generic("Expected a Map".into()));
        }
        Ok(AppConfig {
            servers: field(value, "servers", Vec::new())?,
        })
    }
}
