use std::collections::HashSet;

use crate::{
    errors::DbError,
    models::schema::{AttributeDefinition, SchemaDefinition},
    sql::dml::sql_string_literal,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeRef {
    pub table_id: String,
    pub attribute_id: String,
}

impl AttributeRef {
    pub fn new(table_id: &str, attribute_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            attribute_id: attribute_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Gt,
    Lt,
    Le,
    Like,
    NotLike,
    Is,
    IsNot,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::Is => "IS",
            CompareOp::IsNot => "IS NOT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    In,
    NotIn,
}

impl ListOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ListOp::In => "IN",
            ListOp::NotIn => "NOT IN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Begin,
    End,
}

/// Right-hand value of a condition. Character and date values render quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub value: String,
    pub quoted: bool,
}

impl Literal {
    pub fn char(value: &str) -> Self {
        Self {
            value: value.to_string(),
            quoted: true,
        }
    }

    pub fn date(value: &str) -> Self {
        Self::char(value)
    }

    pub fn bare(value: &str) -> Self {
        Self {
            value: value.to_string(),
            quoted: false,
        }
    }

    pub fn null() -> Self {
        Self::bare("NULL")
    }

    /// Quoting follows the attribute's declared type.
    pub fn typed(attribute: &AttributeDefinition, value: &str) -> Self {
        Self {
            value: value.to_string(),
            quoted: attribute.is_quoted_type(),
        }
    }

    fn render(&self) -> String {
        if self.quoted {
            sql_string_literal(&self.value)
        } else {
            self.value.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionNode {
    Value {
        lhs: AttributeRef,
        op: CompareOp,
        rhs: Literal,
    },
    ValueList {
        lhs: AttributeRef,
        op: ListOp,
        values: Vec<Literal>,
    },
    Join {
        lhs: AttributeRef,
        op: CompareOp,
        rhs: AttributeRef,
    },
    Logical(LogicalOp),
    Group(Grouping),
}

impl ConditionNode {
    fn tables(&self) -> Vec<&str> {
        match self {
            ConditionNode::Value { lhs, .. } | ConditionNode::ValueList { lhs, .. } => {
                vec![lhs.table_id.as_str()]
            }
            ConditionNode::Join { lhs, rhs, .. } => {
                vec![lhs.table_id.as_str(), rhs.table_id.as_str()]
            }
            ConditionNode::Logical(_) | ConditionNode::Group(_) => Vec::new(),
        }
    }

    fn is_condition(&self) -> bool {
        matches!(
            self,
            ConditionNode::Value { .. } | ConditionNode::ValueList { .. } | ConditionNode::Join { .. }
        )
    }
}

/// One entry of a grouped condition list: the operator joining it to the previous entry
/// (ignored for the first entry) and the value condition itself.
pub type GroupedValueCondition = (LogicalOp, AttributeRef, CompareOp, Literal);

/// Builds the WHERE clause of a query as an ordered list of condition nodes.
pub struct ConditionBuilder<'a> {
    schema: &'a SchemaDefinition,
    nodes: Vec<ConditionNode>,
    tables: Vec<String>,
    add_key_joins: bool,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Self {
            schema,
            nodes: Vec::new(),
            tables: Vec::new(),
            add_key_joins: true,
        }
    }

    /// Turns automatic primary-key equi-joins on or off at render time.
    pub fn set_add_key_joins(&mut self, flag: bool) {
        self.add_key_joins = flag;
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.tables.clear();
    }

    pub fn nodes(&self) -> &[ConditionNode] {
        &self.nodes
    }

    /// Replaces the node list. Table registrations are rebuilt from it.
    pub fn set(&mut self, nodes: Vec<ConditionNode>) {
        self.nodes = nodes;
        self.tables.clear();
        let ids: Vec<String> = self
            .nodes
            .iter()
            .flat_map(|n| n.tables())
            .map(str::to_string)
            .collect();
        for id in ids {
            self.register_table(&id);
        }
    }

    /// Copy of this builder with `table_ids` registered ahead of its own tables.
    pub fn with_leading_tables(&self, table_ids: &[&str]) -> ConditionBuilder<'a> {
        let mut cb = ConditionBuilder {
            schema: self.schema,
            nodes: self.nodes.clone(),
            tables: Vec::new(),
            add_key_joins: self.add_key_joins,
        };
        cb.add_tables(table_ids);
        for id in &self.tables {
            cb.register_table(id);
        }
        cb
    }

    /// Tables referenced so far, in order of first reference.
    pub fn table_ids(&self) -> Vec<&str> {
        self.tables.iter().map(String::as_str).collect()
    }

    pub fn add_tables(&mut self, table_ids: &[&str]) {
        for id in table_ids {
            self.register_table(id);
        }
    }

    fn register_table(&mut self, table_id: &str) {
        if !self.tables.iter().any(|t| t == table_id) {
            self.tables.push(table_id.to_string());
        }
    }

    fn push_pre_op(&mut self, pre_op: LogicalOp) {
        match pre_op {
            LogicalOp::Not => {
                self.nodes.push(ConditionNode::Logical(LogicalOp::And));
                self.nodes.push(ConditionNode::Logical(LogicalOp::Not));
            }
            op => self.nodes.push(ConditionNode::Logical(op)),
        }
    }

    fn push_grouped(&mut self, pre_op: LogicalOp, node: ConditionNode) -> bool {
        if self.nodes.contains(&node) {
            return false;
        }
        for id in node.tables() {
            self.register_table(&id.to_string());
        }
        self.push_pre_op(pre_op);
        self.nodes.push(ConditionNode::Group(Grouping::Begin));
        self.nodes.push(node);
        self.nodes.push(ConditionNode::Group(Grouping::End));
        true
    }

    /// Returns false when an identical condition is already present.
    pub fn add_value_condition(
        &mut self,
        lhs: AttributeRef,
        op: CompareOp,
        rhs: Literal,
        pre_op: LogicalOp,
    ) -> bool {
        self.push_grouped(pre_op, ConditionNode::Value { lhs, op, rhs })
    }

    pub fn add_value_list_condition(
        &mut self,
        lhs: AttributeRef,
        op: ListOp,
        values: Vec<Literal>,
        pre_op: LogicalOp,
    ) -> bool {
        self.push_grouped(pre_op, ConditionNode::ValueList { lhs, op, values })
    }

    pub fn add_join_condition(
        &mut self,
        lhs: AttributeRef,
        op: CompareOp,
        rhs: AttributeRef,
        pre_op: LogicalOp,
    ) -> bool {
        if op == CompareOp::Eq && self.has_equi_join(&lhs, &rhs) {
            return false;
        }
        self.push_grouped(pre_op, ConditionNode::Join { lhs, op, rhs })
    }

    /// `pre_op ( (c1) op2 (c2) ... )`, e.g. status in {HOLD, HPUB} as an OR group.
    pub fn add_group_value_condition_list(
        &mut self,
        entries: Vec<GroupedValueCondition>,
        pre_op: LogicalOp,
    ) {
        if entries.is_empty() {
            return;
        }
        self.push_pre_op(pre_op);
        self.nodes.push(ConditionNode::Group(Grouping::Begin));
        for (i, (op, lhs, cmp, rhs)) in entries.into_iter().enumerate() {
            self.register_table(&lhs.table_id.clone());
            if i > 0 {
                self.nodes.push(ConditionNode::Logical(op));
            }
            self.nodes.push(ConditionNode::Group(Grouping::Begin));
            self.nodes.push(ConditionNode::Value { lhs, op: cmp, rhs });
            self.nodes.push(ConditionNode::Group(Grouping::End));
        }
        self.nodes.push(ConditionNode::Group(Grouping::End));
    }

    pub fn add_logical_op(&mut self, op: LogicalOp) {
        self.nodes.push(ConditionNode::Logical(op));
    }

    pub fn begin_group(&mut self) {
        self.nodes.push(ConditionNode::Group(Grouping::Begin));
    }

    pub fn end_group(&mut self) {
        self.nodes.push(ConditionNode::Group(Grouping::End));
    }

    fn has_equi_join(&self, lhs: &AttributeRef, rhs: &AttributeRef) -> bool {
        self.nodes.iter().any(|n| match n {
            ConditionNode::Join {
                lhs: l,
                op: CompareOp::Eq,
                rhs: r,
            } => (l == lhs && r == rhs) || (l == rhs && r == lhs),
            _ => false,
        })
    }

    /// Equi-joins on the primary-key attribute ids shared by each pair of
    /// referenced tables, skipping joins already in the node list.
    pub fn key_attribute_equi_joins(&self) -> Result<Vec<(AttributeRef, AttributeRef)>, DbError> {
        let mut joins: Vec<(AttributeRef, AttributeRef)> = Vec::new();
        for (i, left_id) in self.tables.iter().enumerate() {
            let left = self.schema.table(left_id)?;
            for right_id in &self.tables[i + 1..] {
                let right = self.schema.table(right_id)?;
                let right_keys: HashSet<&str> = right.primary_key_ids().into_iter().collect();
                for key in left.primary_key_ids() {
                    if !right_keys.contains(key) {
                        continue;
                    }
                    let lhs = AttributeRef::new(left_id, key);
                    let rhs = AttributeRef::new(right_id, key);
                    if !self.has_equi_join(&lhs, &rhs) && !joins.contains(&(lhs.clone(), rhs.clone())) {
                        joins.push((lhs, rhs));
                    }
                }
            }
        }
        Ok(joins)
    }

    /// Appends the shared-key equi-joins to the node list; returns how many were added.
    pub fn add_key_attribute_equi_join_conditions(&mut self) -> Result<usize, DbError> {
        let joins = self.key_attribute_equi_joins()?;
        let count = joins.len();
        for (lhs, rhs) in joins {
            self.add_join_condition(lhs, CompareOp::Eq, rhs, LogicalOp::And);
        }
        Ok(count)
    }

    /// Rejects unbalanced or prematurely closed groupings.
    pub fn validate(&self) -> Result<(), DbError> {
        let mut depth: usize = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                ConditionNode::Group(Grouping::Begin) => depth += 1,
                ConditionNode::Group(Grouping::End) => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        DbError::Condition(format!("grouping closed before it was opened at node {}", i))
                    })?;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(DbError::Condition(format!("{} grouping(s) left open", depth)));
        }
        Ok(())
    }

    fn attribute_sql(&self, attr: &AttributeRef) -> Result<String, DbError> {
        self.schema
            .qualified_attribute_name(&attr.table_id, &attr.attribute_id)
    }

    /// Renders the condition. Automatic key joins, when enabled, come first.
    pub fn get_sql(&self) -> Result<String, DbError> {
        self.validate()?;

        let joins = if self.add_key_joins {
            self.key_attribute_equi_joins()?
        } else {
            Vec::new()
        };
        let mut nodes: Vec<ConditionNode> = Vec::new();
        for (lhs, rhs) in &joins {
            nodes.push(ConditionNode::Logical(LogicalOp::And));
            nodes.push(ConditionNode::Group(Grouping::Begin));
            nodes.push(ConditionNode::Join {
                lhs: lhs.clone(),
                op: CompareOp::Eq,
                rhs: rhs.clone(),
            });
            nodes.push(ConditionNode::Group(Grouping::End));
        }

        // The caller's condition is grouped so a top-level OR cannot escape the joins.
        let user: Vec<ConditionNode> = self
            .nodes
            .iter()
            .skip_while(|n| matches!(n, ConditionNode::Logical(LogicalOp::And | LogicalOp::Or)))
            .cloned()
            .collect();
        if joins.is_empty() || user.is_empty() {
            nodes.extend(self.nodes.iter().cloned());
        } else {
            nodes.push(ConditionNode::Logical(LogicalOp::And));
            nodes.push(ConditionNode::Group(Grouping::Begin));
            nodes.extend(user);
            nodes.push(ConditionNode::Group(Grouping::End));
        }

        let mut out = String::new();
        let mut emitted = 0;
        for node in &nodes {
            match node {
                ConditionNode::Value { lhs, op, rhs } => {
                    push_token(
                        &mut out,
                        &format!("{} {} {}", self.attribute_sql(lhs)?, op.as_sql(), rhs.render()),
                    );
                }
                ConditionNode::ValueList { lhs, op, values } => {
                    let rendered: Vec<String> = values.iter().map(Literal::render).collect();
                    push_token(
                        &mut out,
                        &format!(
                            "{} {} ({})",
                            self.attribute_sql(lhs)?,
                            op.as_sql(),
                            rendered.join(",")
                        ),
                    );
                }
                ConditionNode::Join { lhs, op, rhs } => {
                    push_token(
                        &mut out,
                        &format!(
                            "{} {} {}",
                            self.attribute_sql(lhs)?,
                            op.as_sql(),
                            self.attribute_sql(rhs)?
                        ),
                    );
                }
                ConditionNode::Logical(LogicalOp::Not) => push_token(&mut out, "NOT"),
                ConditionNode::Logical(op) => {
                    if emitted > 0 {
                        push_token(&mut out, op.as_sql());
                    }
                }
                ConditionNode::Group(Grouping::Begin) => push_token(&mut out, "("),
                ConditionNode::Group(Grouping::End) => push_token(&mut out, ")"),
            }
            if node.is_condition() {
                emitted += 1;
            }
        }
        Ok(out)
    }
}

fn push_token(out: &mut String, token: &str) {
    if !out.is_empty() && !out.ends_with('(') && token != ")" {
        out.push(' ');
    }
    out.push_str(token);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::schema::{fixtures::attr, TableDefinition, TableType};

    fn table(id: &str, attributes: Vec<AttributeDefinition>) -> TableDefinition {
        TableDefinition {
            table_id: id.to_string(),
            table_name: id.to_lowercase(),
            table_type: TableType::Transactional,
            attributes,
            indices: Vec::new(),
            attribute_map: Vec::new(),
            merge_indices: Vec::new(),
            delete_attribute: None,
        }
    }

    /// `ENTRY` and `STATUS` share the key `ENTRY_ID`; `AUDIT` shares nothing.
    pub fn join_schema() -> SchemaDefinition {
        SchemaDefinition::new(
            "db",
            vec![
                table(
                    "ENTRY",
                    vec![
                        attr("ENTRY_ID", "CHAR", 15, true, 1),
                        attr("TITLE", "VARCHAR", 80, false, 2),
                    ],
                ),
                table(
                    "STATUS",
                    vec![
                        attr("ENTRY_ID", "CHAR", 15, true, 1),
                        attr("CODE", "VARCHAR", 10, false, 2),
                        attr("ORDINAL", "INT", 0, false, 3),
                    ],
                ),
                table(
                    "AUDIT",
                    vec![
                        attr("AUDIT_ID", "INT", 0, true, 1),
                        attr("ENTRY_ID", "CHAR", 15, false, 2),
                    ],
                ),
            ],
        )
        .unwrap()
    }

    fn at(t: &str, a: &str) -> AttributeRef {
        AttributeRef::new(t, a)
    }

    #[test]
    fn test_single_value_condition_drops_leading_op() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Eq, Literal::char("HOLD"), LogicalOp::And);
        assert_eq!(cb.get_sql().unwrap(), "(status.code = 'HOLD')");
    }

    #[test]
    fn test_bare_and_quoted_values() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_value_condition(at("STATUS", "ORDINAL"), CompareOp::Ge, Literal::bare("3"), LogicalOp::And);
        cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Like, Literal::char("H%"), LogicalOp::Or);
        cb.add_value_condition(at("STATUS", "CODE"), CompareOp::IsNot, Literal::null(), LogicalOp::And);
        assert_eq!(
            cb.get_sql().unwrap(),
            "(status.ordinal >= 3) OR (status.code LIKE 'H%') AND (status.code IS NOT NULL)"
        );
    }

    #[test]
    fn test_typed_literal_follows_attribute() {
        let schema = join_schema();
        let ordinal = schema.attribute("STATUS", "ORDINAL").unwrap();
        let code = schema.attribute("STATUS", "CODE").unwrap();
        assert!(!Literal::typed(ordinal, "1").quoted);
        assert!(Literal::typed(code, "x").quoted);
    }

    #[test]
    fn test_duplicate_value_condition_suppressed() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        assert!(cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Eq, Literal::char("A"), LogicalOp::And));
        assert!(!cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Eq, Literal::char("A"), LogicalOp::Or));
        assert_eq!(cb.nodes().len(), 4);
    }

    #[test]
    fn test_group_value_condition_list() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_value_condition(at("STATUS", "ORDINAL"), CompareOp::Gt, Literal::bare("0"), LogicalOp::And);
        cb.add_group_value_condition_list(
            vec![
                (LogicalOp::Or, at("STATUS", "CODE"), CompareOp::Eq, Literal::char("HOLD")),
                (LogicalOp::Or, at("STATUS", "CODE"), CompareOp::Eq, Literal::char("HPUB")),
            ],
            LogicalOp::And,
        );
        assert_eq!(
            cb.get_sql().unwrap(),
            "(status.ordinal > 0) AND ((status.code = 'HOLD') OR (status.code = 'HPUB'))"
        );
    }

    #[test]
    fn test_value_list_and_not() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_value_list_condition(
            at("STATUS", "CODE"),
            ListOp::NotIn,
            vec![Literal::char("OBS"), Literal::char("WDRN")],
            LogicalOp::Not,
        );
        assert_eq!(cb.get_sql().unwrap(), "NOT (status.code NOT IN ('OBS','WDRN'))");
    }

    #[test]
    fn test_auto_equi_join_on_shared_key() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_value_condition(at("ENTRY", "TITLE"), CompareOp::Like, Literal::char("%kinase%"), LogicalOp::And);
        cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Eq, Literal::char("REL"), LogicalOp::And);

        let joins = cb.key_attribute_equi_joins().unwrap();
        assert_eq!(joins, vec![(at("ENTRY", "ENTRY_ID"), at("STATUS", "ENTRY_ID"))]);
        assert_eq!(
            cb.get_sql().unwrap(),
            "(entry.entry_id = status.entry_id) AND ((entry.title LIKE '%kinase%') AND (status.code = 'REL'))"
        );
    }

    #[test]
    fn test_or_condition_stays_inside_key_join() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_value_condition(at("ENTRY", "TITLE"), CompareOp::Eq, Literal::char("x"), LogicalOp::And);
        cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Eq, Literal::char("REL"), LogicalOp::Or);
        assert_eq!(
            cb.get_sql().unwrap(),
            "(entry.entry_id = status.entry_id) AND ((entry.title = 'x') OR (status.code = 'REL'))"
        );

        cb.clear();
        cb.add_tables(&["ENTRY", "STATUS"]);
        cb.add_value_list_condition(
            at("STATUS", "CODE"),
            ListOp::In,
            vec![Literal::char("HOLD")],
            LogicalOp::Not,
        );
        assert_eq!(
            cb.get_sql().unwrap(),
            "(entry.entry_id = status.entry_id) AND (NOT (status.code IN ('HOLD')))"
        );
    }

    #[test]
    fn test_no_join_without_shared_key() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_tables(&["ENTRY", "AUDIT"]);
        assert!(cb.key_attribute_equi_joins().unwrap().is_empty());
    }

    #[test]
    fn test_explicit_join_not_duplicated() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_join_condition(at("STATUS", "ENTRY_ID"), CompareOp::Eq, at("ENTRY", "ENTRY_ID"), LogicalOp::And);
        assert!(cb.key_attribute_equi_joins().unwrap().is_empty());
        assert!(!cb.add_join_condition(at("ENTRY", "ENTRY_ID"), CompareOp::Eq, at("STATUS", "ENTRY_ID"), LogicalOp::And));

        assert_eq!(cb.add_key_attribute_equi_join_conditions().unwrap(), 0);
        assert_eq!(cb.get_sql().unwrap(), "(status.entry_id = entry.entry_id)");
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_tables(&["ENTRY", "STATUS"]);
        cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Eq, Literal::char("REL"), LogicalOp::And);
        let first = cb.get_sql().unwrap();
        assert_eq!(first, cb.get_sql().unwrap());
    }

    #[test]
    fn test_disabled_key_joins() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.set_add_key_joins(false);
        cb.add_tables(&["ENTRY", "STATUS"]);
        assert_eq!(cb.get_sql().unwrap(), "");
        assert_eq!(cb.add_key_attribute_equi_join_conditions().unwrap(), 1);
        assert_eq!(cb.get_sql().unwrap(), "(entry.entry_id = status.entry_id)");
    }

    #[test]
    fn test_unbalanced_grouping_rejected() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.begin_group();
        cb.add_value_condition(at("STATUS", "CODE"), CompareOp::Eq, Literal::char("A"), LogicalOp::And);
        assert!(matches!(cb.get_sql(), Err(DbError::Condition(_))));

        cb.set(vec![ConditionNode::Group(Grouping::End), ConditionNode::Group(Grouping::Begin)]);
        assert!(matches!(cb.validate(), Err(DbError::Condition(_))));
    }

    #[test]
    fn test_set_rebuilds_tables() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.set(vec![ConditionNode::Join {
            lhs: at("AUDIT", "ENTRY_ID"),
            op: CompareOp::Eq,
            rhs: at("ENTRY", "ENTRY_ID"),
        }]);
        assert_eq!(cb.table_ids(), vec!["AUDIT", "ENTRY"]);
        cb.clear();
        assert!(cb.table_ids().is_empty());
    }

    #[test]
    fn test_unknown_attribute_is_error() {
        let schema = join_schema();
        let mut cb = ConditionBuilder::new(&schema);
        cb.add_value_condition(at("STATUS", "NOPE"), CompareOp::Eq, Literal::char("A"), LogicalOp::And);
        assert!(matches!(cb.get_sql(), Err(DbError::Schema(_))));
    }
}
