//! Select-list and embed parsing.
//!
//! The `select=` expression is a comma-separated list at depth zero.
//! An item is an embed iff it contains `(` or a `!<joinKind>` modifier;
//! otherwise it is a column name.

use crate::ast::{Embed, JoinKind};
use crate::error::{QueryError, QueryResult};

use super::{split_top_level, validate_ident};

/// Parse a `select=` expression into main-table columns and embeds.
pub fn parse_select(expr: &str) -> QueryResult<(Vec<String>, Vec<Embed>)> {
    let mut columns = Vec::new();
    let mut embeds = Vec::new();

    for part in split_top_level(expr, ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if is_embed_item(part) {
            embeds.push(parse_embed_item(part)?);
        } else if part == "*" {
            columns.push("*".to_string());
        } else {
            validate_ident(part)?;
            columns.push(part.to_string());
        }
    }

    Ok((columns, embeds))
}

fn is_embed_item(part: &str) -> bool {
    part.contains('(') || part.contains('!')
}

/// Parse one embed item: `table`, `table!kind`, `table(content)` or
/// `table!kind(content)`. Without content the embed selects `*`.
pub fn parse_embed_item(item: &str) -> QueryResult<Embed> {
    let (head, content) = match item.find('(') {
        Some(open) => {
            let inner = item[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| QueryError::select(item, "missing closing parenthesis"))?;
            (&item[..open], Some(inner))
        }
        None => (item, None),
    };

    let (table, join) = parse_table_and_join(head, item)?;
    validate_ident(&table)?;

    let mut embed = Embed::new(table);
    embed.join = join;

    if let Some(content) = content {
        let mut columns = Vec::new();
        for part in split_top_level(content, ',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if is_embed_item(part) {
                embed.embeds.push(parse_embed_item(part)?);
            } else if part == "*" {
                columns.push("*".to_string());
            } else {
                validate_ident(part)?;
                columns.push(part.to_string());
            }
        }
        // Content with only nested embeds keeps the default `*`.
        if !columns.is_empty() {
            embed.columns = columns;
        }
    }

    Ok(embed)
}

fn parse_table_and_join(head: &str, item: &str) -> QueryResult<(String, JoinKind)> {
    match head.split_once('!') {
        Some((table, token)) => {
            let join = JoinKind::from_token(token).ok_or_else(|| {
                QueryError::select(item, format!("unknown join kind '!{token}'"))
            })?;
            Ok((table.to_string(), join))
        }
        None => Ok((head.to_string(), JoinKind::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_columns() {
        let (columns, embeds) = parse_select("id,name,email").unwrap();
        assert_eq!(columns, vec!["id", "name", "email"]);
        assert!(embeds.is_empty());
    }

    #[test]
    fn test_star_column() {
        let (columns, _) = parse_select("*").unwrap();
        assert_eq!(columns, vec!["*"]);
    }

    #[test]
    fn test_embed_with_columns() {
        let (columns, embeds) = parse_select("id,posts(title,body)").unwrap();
        assert_eq!(columns, vec!["id"]);
        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0].table, "posts");
        assert_eq!(embeds[0].columns, vec!["title", "body"]);
        assert_eq!(embeds[0].join, JoinKind::Left);
    }

    #[test]
    fn test_join_modifiers() {
        let (_, embeds) = parse_select("posts!inner(title)").unwrap();
        assert_eq!(embeds[0].join, JoinKind::Inner);
        let (_, embeds) = parse_select("posts!full").unwrap();
        assert_eq!(embeds[0].join, JoinKind::Full);
        assert_eq!(embeds[0].columns, vec!["*"]);
        assert!(parse_select("posts!sideways(title)").is_err());
    }

    #[test]
    fn test_nested_embeds() {
        let (columns, embeds) =
            parse_select("track_id,name,album(title,artist(name))").unwrap();
        assert_eq!(columns, vec!["track_id", "name"]);
        assert_eq!(embeds.len(), 1);
        let album = &embeds[0];
        assert_eq!(album.table, "album");
        assert_eq!(album.columns, vec!["title"]);
        assert_eq!(album.embeds.len(), 1);
        assert_eq!(album.embeds[0].table, "artist");
        assert_eq!(album.embeds[0].columns, vec!["name"]);
    }

    #[test]
    fn test_embed_with_only_nested_keeps_star() {
        let (_, embeds) = parse_select("album(artist(name))").unwrap();
        assert_eq!(embeds[0].columns, vec!["*"]);
        assert_eq!(embeds[0].embeds[0].columns, vec!["name"]);
    }

    #[test]
    fn test_unbalanced_parens_rejected() {
        assert!(parse_select("posts(title").is_err());
    }
}
