use crate::{
    errors::DbError,
    models::schema::SchemaDefinition,
    sql::condition::{AttributeRef, ConditionBuilder},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Renders a single SELECT over one or more schema tables.
pub struct QueryBuilder<'a> {
    schema: &'a SchemaDefinition,
    select: Vec<AttributeRef>,
    order_by: Vec<AttributeRef>,
    sort_order: SortOrder,
    limit: Option<(u64, u64)>,
    condition: Option<ConditionBuilder<'a>>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Self {
            schema,
            select: Vec::new(),
            order_by: Vec::new(),
            sort_order: SortOrder::default(),
            limit: None,
            condition: None,
        }
    }

    pub fn clear(&mut self) {
        self.select.clear();
        self.order_by.clear();
        self.sort_order = SortOrder::default();
        self.limit = None;
        self.condition = None;
    }

    pub fn add_select_attribute(&mut self, attribute: AttributeRef) {
        self.select.push(attribute);
    }

    /// Selects every attribute of `table_id`, in attribute order.
    pub fn add_select_table(&mut self, table_id: &str) -> Result<(), DbError> {
        let table = self.schema.table(table_id)?;
        for attribute_id in table.attribute_ids() {
            self.select.push(AttributeRef::new(table_id, attribute_id));
        }
        Ok(())
    }

    pub fn select_list(&self) -> &[AttributeRef] {
        &self.select
    }

    pub fn add_order_by(&mut self, attribute: AttributeRef) {
        self.order_by.push(attribute);
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) {
        self.sort_order = sort_order;
    }

    pub fn set_limit(&mut self, start: u64, length: u64) {
        self.limit = Some((start, length));
    }

    pub fn set_condition(&mut self, condition: ConditionBuilder<'a>) {
        self.condition = Some(condition);
    }

    fn select_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for attr in &self.select {
            if !tables.contains(&attr.table_id.as_str()) {
                tables.push(attr.table_id.as_str());
            }
        }
        tables
    }

    /// `None` when nothing is selected.
    pub fn get_sql(&self) -> Result<Option<String>, DbError> {
        if self.select.is_empty() {
            return Ok(None);
        }

        let select_tables = self.select_tables();
        let condition = match &self.condition {
            Some(cb) => cb.with_leading_tables(&select_tables),
            None => {
                let mut cb = ConditionBuilder::new(self.schema);
                cb.add_tables(&select_tables);
                cb
            }
        };

        let columns = self
            .select
            .iter()
            .map(|a| self.schema.qualified_attribute_name(&a.table_id, &a.attribute_id))
            .collect::<Result<Vec<_>, _>>()?;
        let tables = condition
            .table_ids()
            .into_iter()
            .map(|id| {
                self.schema
                    .table(id)
                    .map(|t| format!("{}.{}", self.schema.database_name, t.table_name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut lines = vec![
            format!("SELECT {}", columns.join(",")),
            format!("FROM {}", tables.join(",")),
        ];

        let where_clause = condition.get_sql()?;
        if !where_clause.is_empty() {
            lines.push(format!("WHERE {}", where_clause));
        }

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|a| self.schema.qualified_attribute_name(&a.table_id, &a.attribute_id))
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(format!(
                "ORDER BY {} {}",
                order.join(","),
                self.sort_order.as_sql()
            ));
        }

        if let Some((start, length)) = self.limit {
            lines.push(format!("LIMIT {}, {}", start, length));
        }

        Ok(Some(lines.join("\n")))
    }
}
