use crate::error::NormalizeError;
use domain::FieldValue;
use mdt_config::ReceiverConfig;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// 字段值转换目标类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldConversion {
    String,
    Int64,
    Uint64,
    Float64,
    Bool,
}

impl FromStr for FieldConversion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "int64" => Ok(Self::Int64),
            "uint64" => Ok(Self::Uint64),
            "float64" => Ok(Self::Float64),
            "bool" => Ok(Self::Bool),
            other => Err(other.to_string()),
        }
    }
}

impl FieldConversion {
    /// 转换字段值；无法表示时保留原值。
    pub fn apply(self, value: FieldValue) -> FieldValue {
        match (self, value) {
            (Self::String, FieldValue::String(v)) => FieldValue::String(v),
            (Self::String, other) => FieldValue::String(other.to_string()),

            (Self::Int64, FieldValue::Uint(v)) => match i64::try_from(v) {
                Ok(v) => FieldValue::Int(v),
                Err(_) => FieldValue::Uint(v),
            },
            (Self::Int64, FieldValue::Float(v)) => FieldValue::Int(v as i64),
            (Self::Int64, FieldValue::Bool(v)) => FieldValue::Int(i64::from(v)),
            (Self::Int64, FieldValue::String(v)) => match v.trim().parse::<i64>() {
                Ok(parsed) => FieldValue::Int(parsed),
                Err(_) => FieldValue::String(v),
            },

            (Self::Uint64, FieldValue::Int(v)) => match u64::try_from(v) {
                Ok(v) => FieldValue::Uint(v),
                Err(_) => FieldValue::Int(v),
            },
            (Self::Uint64, FieldValue::Float(v)) if v >= 0.0 => FieldValue::Uint(v as u64),
            (Self::Uint64, FieldValue::Bool(v)) => FieldValue::Uint(u64::from(v)),
            (Self::Uint64, FieldValue::String(v)) => match v.trim().parse::<u64>() {
                Ok(parsed) => FieldValue::Uint(parsed),
                Err(_) => FieldValue::String(v),
            },

            (Self::Float64, FieldValue::Int(v)) => FieldValue::Float(v as f64),
            (Self::Float64, FieldValue::Uint(v)) => FieldValue::Float(v as f64),
            (Self::Float64, FieldValue::Bool(v)) => FieldValue::Float(if v { 1.0 } else { 0.0 }),
            (Self::Float64, FieldValue::String(v)) => match v.trim().parse::<f64>() {
                Ok(parsed) => FieldValue::Float(parsed),
                Err(_) => FieldValue::String(v),
            },

            (Self::Bool, FieldValue::Int(v)) => FieldValue::Bool(v != 0),
            (Self::Bool, FieldValue::Uint(v)) => FieldValue::Bool(v != 0),
            (Self::Bool, FieldValue::Float(v)) => FieldValue::Bool(v != 0.0),
            (Self::Bool, FieldValue::String(v)) => match v.trim().parse::<bool>() {
                Ok(parsed) => FieldValue::Bool(parsed),
                Err(_) => FieldValue::String(v),
            },

            (_, other) => other,
        }
    }
}

/// 扁平化选项，启动时构建，此后只读。
#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    /// 编码路径 → 指标名
    pub aliases: HashMap<String, String>,
    /// `<编码路径>/<容器路径>` → 作为标签的叶子名
    pub embedded_tags: HashMap<String, HashSet<String>>,
    pub include_delete_field: bool,
    pub source_field_name: String,
    /// 编码路径 → (字段名 → 输出字段名)
    pub field_names: HashMap<String, HashMap<String, String>>,
    /// 编码路径 → (字段名 → 转换)
    pub field_conversions: HashMap<String, HashMap<String, FieldConversion>>,
}

impl FlattenOptions {
    /// 由运行配置构建；别名反转时路径重复、嵌入标签无 `/`、未知转换类型均报错。
    pub fn from_config(config: &ReceiverConfig) -> Result<Self, NormalizeError> {
        let mut aliases = HashMap::with_capacity(config.aliases.len());
        for (alias, path) in &config.aliases {
            if aliases.insert(path.clone(), alias.clone()).is_some() {
                return Err(NormalizeError::DuplicateAlias(path.clone()));
            }
        }

        let mut embedded_tags: HashMap<String, HashSet<String>> = HashMap::new();
        for tag in &config.embedded_tags {
            let normalized = tag.replace('-', "_");
            let (dir, leaf) = normalized
                .rsplit_once('/')
                .filter(|(dir, leaf)| !dir.is_empty() && !leaf.is_empty())
                .ok_or_else(|| NormalizeError::InvalidEmbeddedTag(tag.clone()))?;
            embedded_tags
                .entry(dir.to_string())
                .or_default()
                .insert(leaf.to_string());
        }

        let mut field_conversions = HashMap::with_capacity(config.field_conversions.len());
        for (path, fields) in &config.field_conversions {
            let mut parsed = HashMap::with_capacity(fields.len());
            for (field, conversion) in fields {
                let value = conversion.parse::<FieldConversion>().map_err(|_| {
                    NormalizeError::UnknownConversion {
                        path: path.clone(),
                        field: field.clone(),
                        conversion: conversion.clone(),
                    }
                })?;
                parsed.insert(field.clone(), value);
            }
            field_conversions.insert(path.clone(), parsed);
        }

        Ok(Self {
            aliases,
            embedded_tags,
            include_delete_field: config.include_delete_field,
            source_field_name: config.source_field_name.clone(),
            field_names: config.field_names.clone(),
            field_conversions,
        })
    }

    /// 指标名：别名优先，否则为原始编码路径。
    pub fn measurement<'a>(&'a self, encoding_path: &'a str) -> &'a str {
        self.aliases
            .get(encoding_path)
            .map(String::as_str)
            .unwrap_or(encoding_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_parse() {
        assert_eq!("string".parse::<FieldConversion>(), Ok(FieldConversion::String));
        assert_eq!("UINT64".parse::<FieldConversion>(), Ok(FieldConversion::Uint64));
        assert!("decimal".parse::<FieldConversion>().is_err());
    }

    #[test]
    fn test_conversion_apply() {
        assert_eq!(
            FieldConversion::String.apply(FieldValue::Int(12)),
            FieldValue::String("12".to_string())
        );
        assert_eq!(
            FieldConversion::Int64.apply(FieldValue::Uint(u64::MAX)),
            FieldValue::Uint(u64::MAX)
        );
        assert_eq!(
            FieldConversion::Uint64.apply(FieldValue::String("7".to_string())),
            FieldValue::Uint(7)
        );
        assert_eq!(
            FieldConversion::Float64.apply(FieldValue::Bool(true)),
            FieldValue::Float(1.0)
        );
        assert_eq!(
            FieldConversion::Bool.apply(FieldValue::String("nope".to_string())),
            FieldValue::String("nope".to_string())
        );
    }

    #[test]
    fn test_from_config_rejects_duplicate_alias() {
        let mut config = ReceiverConfig::default();
        config.aliases.insert("a".to_string(), "type:model/path".to_string());
        config.aliases.insert("b".to_string(), "type:model/path".to_string());
        assert_eq!(
            FlattenOptions::from_config(&config).unwrap_err(),
            NormalizeError::DuplicateAlias("type:model/path".to_string())
        );
    }

    #[test]
    fn test_from_config_embedded_tags() {
        let mut config = ReceiverConfig::default();
        config.embedded_tags = vec![
            "type:model/extra/list/name".to_string(),
            "type:model/extra/list/if-index".to_string(),
        ];
        let options = FlattenOptions::from_config(&config).unwrap();
        let leaves = options.embedded_tags.get("type:model/extra/list").unwrap();
        assert!(leaves.contains("name"));
        assert!(leaves.contains("if_index"));

        config.embedded_tags = vec!["bare".to_string()];
        assert!(matches!(
            FlattenOptions::from_config(&config),
            Err(NormalizeError::InvalidEmbeddedTag(_))
        ));
    }

    #[test]
    fn test_from_config_unknown_conversion() {
        let mut config = ReceiverConfig::default();
        config.field_conversions.insert(
            "sys/lldp".to_string(),
            HashMap::from([("portIdV".to_string(), "decimal".to_string())]),
        );
        assert!(matches!(
            FlattenOptions::from_config(&config),
            Err(NormalizeError::UnknownConversion { .. })
        ));
    }
}
