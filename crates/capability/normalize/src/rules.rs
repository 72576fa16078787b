//! 厂商形态识别。
//!
//! 每个非叶子内容节点按顺序交给匹配器；都不匹配时按通用规则扁平化。

use domain::FieldNode;

/// 表格行容器前缀（NX-API `ROW_*`）。
pub const TABLE_ROW_PREFIX: &str = "ROW_";

/// DME 实体属性节点名。
pub const ENTITY_ATTRIBUTES: &str = "attributes";

/// DME 实体子对象节点名。
pub const ENTITY_CHILDREN: &str = "children";

/// 节点形态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Table,
    Entity,
    Generic,
}

/// 形态匹配器。
pub trait ShapeMatcher: Send + Sync {
    fn shape(&self) -> Shape;

    fn matches(&self, node: &FieldNode) -> bool;
}

/// 包含 `ROW_*` 子节点的表格。
#[derive(Debug, Default)]
pub struct TableMatcher;

impl ShapeMatcher for TableMatcher {
    fn shape(&self) -> Shape {
        Shape::Table
    }

    fn matches(&self, node: &FieldNode) -> bool {
        node.children
            .iter()
            .any(|child| !child.is_leaf() && child.name.starts_with(TABLE_ROW_PREFIX))
    }
}

/// 实体名叶子（`rn` 优先，其次 `dn`）。
pub const ENTITY_NAME_LEAVES: [&str; 2] = ["rn", "dn"];

/// `attributes` 下的属性记录：直接带叶子时自身即为唯一记录。
pub fn entity_records(attributes: &FieldNode) -> Vec<&FieldNode> {
    if attributes.children.iter().any(FieldNode::is_leaf) {
        vec![attributes]
    } else {
        attributes.children.iter().collect()
    }
}

/// 第一条属性记录带 `rn` 或 `dn` 叶子的实体。
#[derive(Debug, Default)]
pub struct EntityMatcher;

impl ShapeMatcher for EntityMatcher {
    fn shape(&self) -> Shape {
        Shape::Entity
    }

    fn matches(&self, node: &FieldNode) -> bool {
        let Some(attributes) = node.child(ENTITY_ATTRIBUTES) else {
            return false;
        };
        entity_records(attributes).first().is_some_and(|record| {
            ENTITY_NAME_LEAVES
                .iter()
                .any(|name| record.child(name).is_some_and(FieldNode::is_leaf))
        })
    }
}

/// 有序匹配器列表。
pub struct RuleSet {
    matchers: Vec<Box<dyn ShapeMatcher>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(vec![Box::new(TableMatcher), Box::new(EntityMatcher)])
    }
}

impl RuleSet {
    pub fn new(matchers: Vec<Box<dyn ShapeMatcher>>) -> Self {
        Self { matchers }
    }

    /// 第一个匹配的形态；叶子和无匹配的节点为 `Generic`。
    pub fn classify(&self, node: &FieldNode) -> Shape {
        if node.is_leaf() {
            return Shape::Generic;
        }
        self.matchers
            .iter()
            .find(|matcher| matcher.matches(node))
            .map(|matcher| matcher.shape())
            .unwrap_or(Shape::Generic)
    }
}
