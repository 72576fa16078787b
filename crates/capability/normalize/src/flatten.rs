use crate::error::{TransformError, TransformErrorKind};
use crate::options::{FieldConversion, FlattenOptions};
use crate::rules::{
    ENTITY_ATTRIBUTES, ENTITY_CHILDREN, ENTITY_NAME_LEAVES, RuleSet, Shape, TABLE_ROW_PREFIX,
    entity_records,
};
use domain::{FieldNode, FieldValue, Fields, Metric, ScalarValue, Tags, TelemetryRecord};
use std::collections::HashMap;

/// 字段树最大嵌套深度。
pub const MAX_DEPTH: usize = 64;

const KEYS: &str = "keys";
const CONTENT: &str = "content";
const ROW_NUMBER: &str = "row_number";
const DELETE: &str = "delete";

/// 一条记录的扁平化结果。
#[derive(Debug, Default)]
pub struct Flattened {
    pub metrics: Vec<Metric>,
    pub errors: Vec<TransformError>,
}

/// 记录扁平化器（无状态，可跨连接共享）。
pub struct Flattener {
    options: FlattenOptions,
    rules: RuleSet,
}

impl Flattener {
    pub fn new(options: FlattenOptions) -> Self {
        Self::with_rules(options, RuleSet::default())
    }

    pub fn with_rules(options: FlattenOptions, rules: RuleSet) -> Self {
        Self { options, rules }
    }

    pub fn options(&self) -> &FlattenOptions {
        &self.options
    }

    /// 扁平化一条记录。行按顺序处理，单行失败记入 `errors` 后继续。
    pub fn flatten(&self, record: &TelemetryRecord) -> Flattened {
        let measurement = self.options.measurement(&record.encoding_path);
        let timestamp_ms = if record.timestamp_ms > 0 {
            record.timestamp_ms
        } else {
            domain::now_epoch_ms()
        };
        let ctx = RowContext::new(&self.options, &self.rules, record);

        let mut out = Flattened::default();
        for (row, node) in record.rows.iter().enumerate() {
            match ctx.flatten_row(node) {
                Ok(series) => {
                    out.metrics
                        .extend(series.into_iter().map(|(tags, fields)| Metric {
                            name: measurement.to_string(),
                            tags,
                            fields,
                            timestamp_ms,
                        }));
                }
                Err(kind) => {
                    tracing::debug!(
                        target: "mdt.normalize",
                        path = %record.encoding_path,
                        row,
                        error = %kind,
                        "row skipped"
                    );
                    out.errors.push(TransformError {
                        path: record.encoding_path.clone(),
                        row,
                        kind,
                    });
                }
            }
        }
        out
    }
}

/// 行内按标签集合分组的字段；序列保持首次出现的顺序。
#[derive(Default)]
struct Grouper {
    series: Vec<(Tags, Fields)>,
    index: HashMap<Tags, usize>,
}

impl Grouper {
    fn add(&mut self, tags: &Tags, name: String, value: FieldValue) {
        let pos = match self.index.get(tags) {
            Some(&pos) => pos,
            None => {
                let pos = self.series.len();
                self.index.insert(tags.clone(), pos);
                self.series.push((tags.clone(), Fields::new()));
                pos
            }
        };
        self.series[pos].1.insert(name, value);
    }
}

struct RowContext<'a> {
    options: &'a FlattenOptions,
    rules: &'a RuleSet,
    record: &'a TelemetryRecord,
    /// 嵌入标签查找前缀（已规范化的编码路径）
    embedded_prefix: String,
    /// 厂商原生路径（不含 `:`）
    native: bool,
    field_names: Option<&'a HashMap<String, String>>,
    conversions: Option<&'a HashMap<String, FieldConversion>>,
}

type RowResult<T> = Result<T, TransformErrorKind>;

impl<'a> RowContext<'a> {
    fn new(options: &'a FlattenOptions, rules: &'a RuleSet, record: &'a TelemetryRecord) -> Self {
        let path = record.encoding_path.as_str();
        Self {
            options,
            rules,
            record,
            embedded_prefix: normalize_name(path),
            native: !path.contains(':'),
            field_names: options.field_names.get(path),
            conversions: options.field_conversions.get(path),
        }
    }

    fn flatten_row(&self, row: &FieldNode) -> RowResult<Vec<(Tags, Fields)>> {
        let mut tags = self.key_tags(row.child(KEYS))?;
        tags.insert("source".to_string(), self.record.node_id.clone());
        tags.insert("subscription".to_string(), self.record.subscription_id.clone());
        tags.insert("path".to_string(), self.record.encoding_path.clone());

        if row.delete {
            if !self.options.include_delete_field {
                return Ok(Vec::new());
            }
            let mut fields = Fields::new();
            fields.insert(DELETE.to_string(), FieldValue::Bool(true));
            return Ok(vec![(tags, fields)]);
        }

        let mut grouper = Grouper::default();
        for child in &row.children {
            match child.name.as_str() {
                KEYS => {}
                CONTENT => {
                    for node in &child.children {
                        self.walk(node, "", &tags, &mut grouper, 2)?;
                    }
                }
                _ => self.walk(child, "", &tags, &mut grouper, 1)?,
            }
        }

        let mut series = grouper.series;
        if self.options.include_delete_field {
            for (_, fields) in &mut series {
                fields.insert(DELETE.to_string(), FieldValue::Bool(false));
            }
        }
        Ok(series)
    }

    /// keys 子树 → 标签。叶子名不冲突时用短名，否则用 keys 下的完整路径。
    fn key_tags(&self, keys: Option<&FieldNode>) -> RowResult<Tags> {
        let mut leaves = Vec::new();
        if let Some(keys) = keys {
            collect_key_leaves(keys, "", &mut leaves, 1)?;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (short, _, _) in &leaves {
            *counts.entry(short.as_str()).or_default() += 1;
        }

        let mut tags = Tags::new();
        for (short, full, value) in &leaves {
            let key = if counts.get(short.as_str()) == Some(&1) {
                short
            } else {
                full
            };
            let key = if key == "source" {
                self.options.source_field_name.clone()
            } else {
                key.clone()
            };
            tags.insert(key, value.clone());
        }
        Ok(tags)
    }

    fn walk(
        &self,
        node: &FieldNode,
        prefix: &str,
        tags: &Tags,
        grouper: &mut Grouper,
        depth: usize,
    ) -> RowResult<()> {
        if depth > MAX_DEPTH {
            return Err(TransformErrorKind::TooDeep(MAX_DEPTH));
        }

        let path = join(prefix, &normalize_name(&node.name));
        if let Some(value) = &node.value {
            if !path.is_empty() && !is_never(&node.name, value) {
                self.add_field(grouper, tags, path, FieldValue::from(value));
            }
            return Ok(());
        }

        match self.rules.classify(node) {
            Shape::Table => self.walk_table(node, &path, tags, grouper, depth),
            Shape::Entity => self.walk_entity(node, &path, tags, grouper, depth),
            Shape::Generic => self.walk_generic(node, &path, tags, grouper, depth),
        }
    }

    fn walk_generic(
        &self,
        node: &FieldNode,
        path: &str,
        tags: &Tags,
        grouper: &mut Grouper,
        depth: usize,
    ) -> RowResult<()> {
        let embedded = if path.is_empty() {
            None
        } else {
            self.options
                .embedded_tags
                .get(&format!("{}/{}", self.embedded_prefix, path))
        };

        let Some(tag_leaves) = embedded else {
            for child in &node.children {
                self.walk(child, path, tags, grouper, depth + 1)?;
            }
            return Ok(());
        };

        // 每次重复带自己的标签，产生独立的序列
        let mut scoped = tags.clone();
        let is_tag_leaf = |child: &FieldNode| {
            child.is_leaf() && tag_leaves.contains(&normalize_name(&child.name))
        };
        for child in node.children.iter().filter(|&child| is_tag_leaf(child)) {
            if let Some(value) = &child.value {
                scoped.insert(
                    format!("{}/{}", path, normalize_name(&child.name)),
                    value.to_tag_string(),
                );
            }
        }
        for child in node.children.iter().filter(|&child| !is_tag_leaf(child)) {
            self.walk(child, path, &scoped, grouper, depth + 1)?;
        }
        Ok(())
    }

    fn walk_table(
        &self,
        node: &FieldNode,
        path: &str,
        tags: &Tags,
        grouper: &mut Grouper,
        depth: usize,
    ) -> RowResult<()> {
        let is_row_container =
            |child: &FieldNode| !child.is_leaf() && child.name.starts_with(TABLE_ROW_PREFIX);
        let mut row_numbers: HashMap<String, usize> = HashMap::new();

        for container in node.children.iter().filter(|&child| is_row_container(child)) {
            let key = match last_segment(path) {
                "" => normalize_name(&container.name),
                segment => segment.to_string(),
            };

            // 单行表格的 ROW_* 直接携带叶子
            let rows: Vec<&FieldNode> = if container.children.iter().any(FieldNode::is_leaf) {
                vec![container]
            } else {
                container.children.iter().collect()
            };

            for row in rows {
                let (index_pos, index_node, index_value) = row
                    .children
                    .iter()
                    .enumerate()
                    .find_map(|(pos, child)| child.value.as_ref().map(|value| (pos, child, value)))
                    .ok_or_else(|| TransformErrorKind::MissingTableIndex(key.clone()))?;

                let tag_value = index_value.to_tag_string();
                let counter = row_numbers.entry(tag_value.clone()).or_insert(0);
                let mut row_tags = tags.clone();
                row_tags.insert(key.clone(), tag_value);
                row_tags.insert(ROW_NUMBER.to_string(), counter.to_string());
                *counter += 1;

                if row.children.len() == 1 {
                    self.add_field(
                        grouper,
                        &row_tags,
                        normalize_name(&index_node.name),
                        FieldValue::from(index_value),
                    );
                }
                for (pos, child) in row.children.iter().enumerate() {
                    if pos != index_pos {
                        self.walk(child, "", &row_tags, grouper, depth + 2)?;
                    }
                }
            }
        }

        for child in node.children.iter().filter(|&child| !is_row_container(child)) {
            self.walk(child, path, tags, grouper, depth + 1)?;
        }
        Ok(())
    }

    fn walk_entity(
        &self,
        node: &FieldNode,
        path: &str,
        tags: &Tags,
        grouper: &mut Grouper,
        depth: usize,
    ) -> RowResult<()> {
        let key = match last_segment(path) {
            "" => "rn".to_string(),
            segment => segment.to_string(),
        };

        let mut inherited: Option<Tags> = None;
        if let Some(attributes) = node.child(ENTITY_ATTRIBUTES) {
            // 第一条记录已由匹配器保证带名字，后续记录缺名只在原生路径上报错
            for record in entity_records(attributes) {
                let name = ENTITY_NAME_LEAVES
                    .iter()
                    .find_map(|name| record.child(name).and_then(|leaf| leaf.value.as_ref()));
                let mut record_tags = tags.clone();
                match name {
                    Some(value) => {
                        record_tags.insert(key.clone(), value.to_tag_string());
                    }
                    None if self.native => {
                        return Err(TransformErrorKind::MissingEntityName(key));
                    }
                    None => {}
                }

                for child in &record.children {
                    match &child.value {
                        Some(_) if child.name == "rn" => {}
                        Some(value) if is_never(&child.name, value) => {}
                        Some(value) => self.add_field(
                            grouper,
                            &record_tags,
                            normalize_name(&child.name),
                            entity_value(value),
                        ),
                        None => self.walk(child, "", &record_tags, grouper, depth + 3)?,
                    }
                }
                inherited.get_or_insert(record_tags);
            }
        }

        let inherited = inherited.unwrap_or_else(|| tags.clone());
        for child in &node.children {
            match child.name.as_str() {
                ENTITY_ATTRIBUTES => {}
                ENTITY_CHILDREN => {
                    for nested in &child.children {
                        self.walk(nested, "", &inherited, grouper, depth + 2)?;
                    }
                }
                _ => self.walk(child, path, tags, grouper, depth + 1)?,
            }
        }
        Ok(())
    }

    fn add_field(&self, grouper: &mut Grouper, tags: &Tags, name: String, value: FieldValue) {
        let value = match self.conversions.and_then(|conversions| conversions.get(&name)) {
            Some(conversion) => conversion.apply(value),
            None => value,
        };
        let name = self
            .field_names
            .and_then(|names| names.get(&name))
            .cloned()
            .unwrap_or(name);
        grouper.add(tags, name, value);
    }
}

/// 收集 keys 叶子：(短名, 完整路径, 标签值)。空值跳过。
fn collect_key_leaves(
    node: &FieldNode,
    prefix: &str,
    out: &mut Vec<(String, String, String)>,
    depth: usize,
) -> RowResult<()> {
    if depth > MAX_DEPTH {
        return Err(TransformErrorKind::TooDeep(MAX_DEPTH));
    }
    for child in &node.children {
        let name = normalize_name(&child.name);
        let path = join(prefix, &name);
        match &child.value {
            Some(value) => {
                let value = value.to_tag_string();
                if !name.is_empty() && !value.is_empty() {
                    out.push((name, path, value));
                }
            }
            None => collect_key_leaves(child, &path, out, depth + 1)?,
        }
    }
    Ok(())
}

/// 实体属性中的无符号整数：能放进 i64 时为整数，否则为十进制字符串。
fn entity_value(value: &ScalarValue) -> FieldValue {
    match value {
        ScalarValue::U32(v) => FieldValue::Int(i64::from(*v)),
        ScalarValue::U64(v) => match i64::try_from(*v) {
            Ok(v) => FieldValue::Int(v),
            Err(_) => FieldValue::String(v.to_string()),
        },
        other => FieldValue::from(other),
    }
}

/// `modTs` / `createTs` 为 `never` 时不输出。
fn is_never(name: &str, value: &ScalarValue) -> bool {
    matches!(name, "modTs" | "createTs") && value.as_str() == Some("never")
}

fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

fn join(prefix: &str, name: &str) -> String {
    match (prefix.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, name),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
