//! SQL fragments and their compilation.

use crate::chunk::{Arg, Chunk, check_rows};
use crate::dialect::Dialect;
use crate::error::{Result, TemplateError};
use crate::value::Value;

/// A SQL fragment: literal text interleaved with interpolated arguments.
///
/// Fragments are built once with [`Sql::new`] or [`sql!`](crate::sql),
/// composed with [`append`](Sql::append) and [`join`](Sql::join), and
/// compiled per dialect with [`to_sql`](Sql::to_sql). Adjacent literal text
/// is always fused into one chunk and empty text is never stored.
///
/// # Example
///
/// ```
/// use sqltag_template::{Postgres, sql};
///
/// let mut query = sql!("select * from users where id = {}", 7)?;
/// query.append(sql!(" and active = {}", true)?);
///
/// let compiled = query.to_sql(&Postgres)?;
/// assert_eq!(compiled.query, "select * from users where id = $1 and active = $2");
/// assert_eq!(compiled.params.len(), 2);
/// # Ok::<(), sqltag_template::TemplateError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    chunks: Vec<Chunk>,
}

/// A compiled query: SQL text plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text with dialect placeholders.
    pub query: String,
    /// Parameters in placeholder order.
    pub params: Vec<Value>,
}

impl Sql {
    /// Build a fragment from literal strings and the arguments between them.
    ///
    /// `strings` must be exactly one longer than `args`. Missing and
    /// unsupported arguments are rejected here, as are malformed VALUES
    /// batches.
    pub fn new(strings: &[&str], args: Vec<Arg>) -> Result<Self> {
        if strings.len() != args.len() + 1 {
            return Err(TemplateError::ArgumentCount {
                expected: strings.len().saturating_sub(1),
                found: args.len(),
            });
        }

        let mut sql = Self::empty();
        let mut strings = strings.iter();
        if let Some(first) = strings.next() {
            sql.push_text(first);
        }
        for (arg, text) in args.into_iter().zip(strings) {
            sql.push_arg(arg)?;
            sql.push_text(text);
        }
        Ok(sql)
    }

    /// Build a fragment from a template with `{}` placeholders. `{{` and
    /// `}}` stand for literal braces.
    pub fn format(template: &str, args: Vec<Arg>) -> Result<Self> {
        let strings = split_placeholders(template)?;
        let strings: Vec<&str> = strings.iter().map(String::as_str).collect();
        Self::new(&strings, args)
    }

    /// A fragment of literal text.
    #[must_use]
    pub fn literal(text: impl AsRef<str>) -> Self {
        let mut sql = Self::empty();
        sql.push_text(text.as_ref());
        sql
    }

    /// An empty fragment.
    #[must_use]
    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Join fragments with literal `separator` text between them.
    pub fn join(fragments: impl IntoIterator<Item = Sql>, separator: &str) -> Self {
        let mut sql = Self::empty();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                sql.push_text(separator);
            }
            sql.append(fragment);
        }
        sql
    }

    /// The chunk sequence.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Check if the fragment has no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Append `other` as if it were written at the end of this fragment.
    pub fn append(&mut self, other: Sql) -> &mut Self {
        for chunk in other.chunks {
            match chunk {
                Chunk::Text(text) => self.push_text(&text),
                chunk => self.chunks.push(chunk),
            }
        }
        self
    }

    /// Compile against `dialect`.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<CompiledQuery> {
        let mut query = String::new();
        let mut params = Vec::new();
        for chunk in &self.chunks {
            query.push_str(&chunk.resolve(dialect, &mut params)?);
        }

        tracing::trace!(
            dialect = dialect.name(),
            params = params.len(),
            "compiled sql template"
        );
        Ok(CompiledQuery { query, params })
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Chunk::Text(last)) = self.chunks.last_mut() {
            last.push_str(text);
        } else {
            self.chunks.push(Chunk::Text(text.to_owned()));
        }
    }

    fn push_arg(&mut self, arg: Arg) -> Result<()> {
        match arg {
            Arg::Value(value) => self.chunks.push(Chunk::Param(value)),
            Arg::Chunk(Chunk::Text(text)) => self.push_text(&text),
            Arg::Chunk(Chunk::Values(rows)) => {
                check_rows(&rows)?;
                self.chunks.push(Chunk::Values(rows));
            }
            Arg::Chunk(chunk) => self.chunks.push(chunk),
            Arg::Fragment(fragment) => {
                self.append(fragment);
            }
            Arg::Undefined => return Err(TemplateError::UndefinedParameter),
            Arg::Unsupported { kind } => return Err(TemplateError::UnsupportedParameter { kind }),
        }
        Ok(())
    }
}

/// Split a `{}` template into the literal strings around the placeholders.
fn split_placeholders(template: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => match chars.peek() {
                Some((_, '{')) => {
                    chars.next();
                    current.push('{');
                }
                Some((_, '}')) => {
                    chars.next();
                    strings.push(std::mem::take(&mut current));
                }
                _ => return Err(TemplateError::UnmatchedBrace { brace: '{', position }),
            },
            '}' => match chars.peek() {
                Some((_, '}')) => {
                    chars.next();
                    current.push('}');
                }
                _ => return Err(TemplateError::UnmatchedBrace { brace: '}', position }),
            },
            c => current.push(c),
        }
    }
    strings.push(current);
    Ok(strings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::chunk::{default_marker, identifier, raw, values};
    use crate::dialect::{Mssql, MySql, Postgres};
    use crate::{IdentifierObject, row, sql};

    #[test]
    fn test_insert_with_identifier_and_values() {
        let query = sql!(
            "insert into {} values {};",
            identifier("users"),
            values(vec![row![1, default_marker()]])
        )
        .unwrap();

        let compiled = query.to_sql(&Postgres).unwrap();
        assert_eq!(
            compiled.query,
            r#"insert into "users" values ($1, default);"#
        );
        assert_eq!(compiled.params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_new_checks_argument_count() {
        assert_eq!(
            Sql::new(&["a", "b"], vec![]),
            Err(TemplateError::ArgumentCount {
                expected: 1,
                found: 0
            })
        );
        assert_eq!(
            sql!("select {}"),
            Err(TemplateError::ArgumentCount {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn test_rejects_undefined_and_unsupported() {
        assert_eq!(
            Sql::new(&["select ", ""], vec![Arg::Undefined]),
            Err(TemplateError::UndefinedParameter)
        );
        let err = Sql::new(&["select ", ""], vec![Arg::unsupported("function")]).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnsupportedParameter { kind: "function" }
        );
        assert_eq!(err.to_string(), "can't specify function as parameter");
        assert!(
            TemplateError::UndefinedParameter
                .to_string()
                .starts_with("can't specify undefined as parameter")
        );
    }

    #[test]
    fn test_malformed_values_rejected_at_construction() {
        assert_eq!(
            sql!("insert into t values {}", values(vec![])),
            Err(TemplateError::ValuesEmpty)
        );
    }

    #[test]
    fn test_no_empty_text_chunks() {
        let query = sql!("{}{}", 1, 2).unwrap();
        assert_eq!(
            query.chunks(),
            &[Chunk::Param(Value::Int(1)), Chunk::Param(Value::Int(2))]
        );
        assert!(Sql::literal("").is_empty());
    }

    #[test]
    fn test_nested_fragments_fuse_text() {
        let filter = sql!("name = {}", "ann").unwrap();
        let query = sql!(
            "select * from t where {} and {} order by id",
            filter,
            raw("1 = 1").unwrap()
        )
        .unwrap();

        assert_eq!(
            query.chunks(),
            &[
                Chunk::Text("select * from t where name = ".into()),
                Chunk::Param(Value::Text("ann".into())),
                Chunk::Text(" and ".into()),
                Chunk::Raw("1 = 1".into()),
                Chunk::Text(" order by id".into()),
            ]
        );
    }

    #[test]
    fn test_append_fuses_and_keeps_param_order() {
        let mut query = sql!("select * from t where a = {}", 1).unwrap();
        query.append(Sql::literal(" and "));
        query.append(sql!("b = {} and c = {}", 2, raw("now()").unwrap()).unwrap());
        query.append(sql!(" limit {}", 10).unwrap());

        let texts = query
            .chunks()
            .iter()
            .filter(|chunk| matches!(chunk, Chunk::Text(_)))
            .count();
        assert_eq!(texts, 4);

        let compiled = query.to_sql(&Postgres).unwrap();
        assert_eq!(
            compiled.query,
            "select * from t where a = $1 and b = $2 and c = now() limit $3"
        );
        assert_eq!(
            compiled.params,
            vec![Value::Int(1), Value::Int(2), Value::Int(10)]
        );
    }

    #[test]
    fn test_join() {
        let filters = vec![
            sql!("a = {}", 1).unwrap(),
            sql!("b = {}", 2).unwrap(),
            Sql::literal("c is null"),
        ];
        let mut query = Sql::literal("select 1 where ");
        query.append(Sql::join(filters, " and "));

        let compiled = query.to_sql(&Mssql).unwrap();
        assert_eq!(
            compiled.query,
            "select 1 where a = @p1 and b = @p2 and c is null"
        );
    }

    #[test]
    fn test_same_template_compiles_per_dialect() {
        let query = sql!(
            "select {} from {} where id = {}",
            identifier(["id", "name"]),
            identifier("users"),
            5
        )
        .unwrap();

        assert_eq!(
            query.to_sql(&Postgres).unwrap().query,
            r#"select "id", "name" from "users" where id = $1"#
        );
        assert_eq!(
            query.to_sql(&MySql).unwrap().query,
            "select `id`, `name` from `users` where id = ?"
        );
        assert_eq!(
            query.to_sql(&Mssql).unwrap().query,
            "select [id], [name] from [users] where id = @p1"
        );
    }

    #[test]
    fn test_identifier_errors_surface_at_compile() {
        let query = sql!(
            "select {}",
            identifier(IdentifierObject::new().schema("public").column("name"))
        )
        .unwrap();
        assert_eq!(
            query.to_sql(&Postgres),
            Err(TemplateError::IdentifierNeedTable)
        );
    }

    #[test]
    fn test_format_braces() {
        assert_eq!(
            split_placeholders("a {{x}} {} b").unwrap(),
            vec!["a {x} ".to_owned(), " b".to_owned()]
        );
        assert_eq!(
            split_placeholders("a { b"),
            Err(TemplateError::UnmatchedBrace {
                brace: '{',
                position: 2
            })
        );
        assert_eq!(
            split_placeholders("}"),
            Err(TemplateError::UnmatchedBrace {
                brace: '}',
                position: 0
            })
        );
    }

    proptest! {
        #[test]
        fn literal_fragments_join_to_plain_text(
            parts in proptest::collection::vec("[a-z ]{0,8}", 0..6)
        ) {
            let joined = Sql::join(parts.iter().map(Sql::literal), ",");
            let expected = parts.join(",");

            prop_assert!(joined.chunks().len() <= 1);
            prop_assert_eq!(joined.to_sql(&Postgres).unwrap().query, expected);
        }
    }
}
