// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::bail_invalid;
use crate::prelude::*;
use std::ops::Range;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionFragment {
    /// `@name`, looked up in the [`SelectionGroups`] at resolve time
    Group(String),
    Range(Range<u32>),
    Single(u32),
}

/// A textual selection of mesh elements, e.g. `0..4, 7, @seam`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionExpression {
    All,
    None,
    Explicit(Vec<SelectionFragment>),
}

/// Named lists of element ids, referenced from expressions as `@name`.
pub type SelectionGroups = BTreeMap<String, Vec<u32>>;

mod grammar {
    use super::{SelectionExpression, SelectionFragment};
    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::{alphanumeric1, char, digit1, satisfy, space0},
        combinator::{map, map_res, opt, recognize},
        multi::{many0_count, separated_list1},
        sequence::{delimited, pair, preceded, separated_pair},
        IResult,
    };

    fn number(input: &str) -> IResult<&str, u32> {
        map_res(digit1, str::parse::<u32>)(input)
    }

    /// Lowercase start, then alphanumeric words joined by single underscores
    fn group_name(input: &str) -> IResult<&str, &str> {
        recognize(pair(
            satisfy(|c| c.is_lowercase()),
            many0_count(preceded(opt(char('_')), alphanumeric1)),
        ))(input)
    }

    fn fragment(input: &str) -> IResult<&str, SelectionFragment> {
        alt((
            map(preceded(char('@'), group_name), |name| {
                SelectionFragment::Group(name.to_owned())
            }),
            map(separated_pair(number, tag(".."), number), |(start, end)| {
                SelectionFragment::Range(start..end)
            }),
            map(number, SelectionFragment::Single),
        ))(input)
    }

    pub fn expression(input: &str) -> IResult<&str, SelectionExpression> {
        preceded(
            space0,
            alt((
                map(char('*'), |_| SelectionExpression::All),
                map(
                    separated_list1(delimited(space0, char(','), space0), fragment),
                    SelectionExpression::Explicit,
                ),
            )),
        )(input)
    }
}

impl SelectionExpression {
    /// Parses a [`SelectionExpression`]. Accepted forms:
    /// ```ignore
    /// 0, 1, 2         // Elements 0, 1 and 2
    /// *               // Every element
    /// 0..5, 7..10, 13 // Half-open ranges and singles
    /// @seam, 4        // Named groups
    ///                 // (blank) selects nothing
    /// ```
    pub fn parse(input: &str) -> MeshResult<SelectionExpression> {
        if input.trim().is_empty() {
            return Ok(SelectionExpression::None);
        }
        match grammar::expression(input) {
            Ok((rest, _)) if !rest.trim().is_empty() => {
                bail_invalid!("Unexpected '{rest}' at the end of selection '{input}'")
            }
            Ok((_, parsed)) => Ok(parsed),
            Err(err) => bail_invalid!("Cannot parse selection '{input}': {err}"),
        }
    }

    /// Resolves the expression against `count` elements. Returns the sorted
    /// list of distinct selected ids.
    pub fn resolve<Id>(&self, count: usize, groups: &SelectionGroups) -> MeshResult<Vec<Id>>
    where
        Id: From<usize> + Ord,
    {
        let mut ids = BTreeSet::new();
        let mut add = |i: u32| -> MeshResult<()> {
            if i as usize >= count {
                bail_invalid!("Selected element {i} out of range ({count} elements)")
            }
            ids.insert(i as usize);
            Ok(())
        };

        match self {
            SelectionExpression::All => (0..count as u32).try_for_each(&mut add)?,
            SelectionExpression::None => {}
            SelectionExpression::Explicit(fragments) => {
                for fragment in fragments {
                    match fragment {
                        SelectionFragment::Single(i) => add(*i)?,
                        SelectionFragment::Range(r) => r.clone().try_for_each(&mut add)?,
                        SelectionFragment::Group(name) => match groups.get(name) {
                            Some(group) => group.iter().try_for_each(|&i| add(i))?,
                            None => bail_invalid!("Unknown selection group '@{name}'"),
                        },
                    }
                }
            }
        }

        Ok(ids.into_iter().map(Id::from).collect())
    }
}

impl std::fmt::Display for SelectionFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionFragment::Group(name) => write!(f, "@{name}"),
            SelectionFragment::Range(r) => write!(f, "{}..{}", r.start, r.end),
            SelectionFragment::Single(i) => write!(f, "{i}"),
        }
    }
}

impl std::fmt::Display for SelectionExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionExpression::All => f.write_str("*"),
            SelectionExpression::None => Ok(()),
            SelectionExpression::Explicit(fragments) => {
                write!(f, "{}", fragments.iter().format(", "))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::SelectionFragment::*;
    use super::*;

    fn parse(s: &str) -> SelectionExpression {
        SelectionExpression::parse(s).unwrap()
    }

    #[test]
    pub fn wildcard_and_blank() {
        assert_eq!(parse(" * "), SelectionExpression::All);
        assert_eq!(parse(""), SelectionExpression::None);
        assert_eq!(parse("\t "), SelectionExpression::None);
    }

    #[test]
    pub fn seam_selections() {
        assert_eq!(
            parse("@left_rim, 0..8,12"),
            SelectionExpression::Explicit(vec![
                Group("left_rim".into()),
                Range(0..8),
                Single(12)
            ])
        );
        assert_eq!(parse("@left_rim ,0..8,   12").to_string(), "@left_rim, 0..8, 12");
        assert_eq!(parse("*").to_string(), "*");
    }

    #[test]
    pub fn rejected_selections() {
        for bad in ["3, *", "4 5", "rim", "@Rim", "@2", "0..", "4294967296"] {
            let err = SelectionExpression::parse(bad).unwrap_err();
            assert!(err.is_invalid_parameter(), "{bad} gave {err}");
        }
    }

    #[test]
    pub fn resolve_against_groups() {
        let mut groups = SelectionGroups::new();
        groups.insert("rim".into(), vec![7, 1]);

        let edges: Vec<EdgeId> = parse("@rim, 2..4, 3").resolve(8, &groups).unwrap();
        assert_eq!(edges, [1, 2, 3, 7].map(EdgeId));

        let faces: Vec<FaceId> = SelectionExpression::All.resolve(2, &groups).unwrap();
        assert_eq!(faces, vec![FaceId(0), FaceId(1)]);
        assert!(SelectionExpression::None
            .resolve::<VertexId>(0, &groups)
            .unwrap()
            .is_empty());

        assert!(parse("@rim").resolve::<EdgeId>(7, &groups).is_err());
        assert!(parse("@seam").resolve::<EdgeId>(8, &groups).is_err());
    }
}
