//! Recursive compiler from a pattern tree to per-dialect native query clauses.

use crate::{
    config::ConnectorConfig,
    dialect::{accepted_types, is_reference_field, Dialect, DialectProfile, ThreatType},
    error::{Result, TranslateError},
    format::format_queries,
    mapping::FieldMapper,
    models::QueryPayload,
    pattern::{BooleanOperator, ComparisonOperator, FilterNode, Literal, ObjectPath, ObservationOperator, Qualifier},
    value::{classify, escape},
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, warn};

/// One native clause plus the qualifiers collected on the way up the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQuery {
    pub clause: String,
    pub qualifiers: Vec<Qualifier>,
}

impl RenderedQuery {
    pub fn bare(clause: impl Into<String>) -> Self {
        Self {
            clause: clause.into(),
            qualifiers: Vec::new(),
        }
    }

    /// The clause followed by every qualifier, space separated.
    pub fn text(&self) -> String {
        let mut text = self.clause.clone();
        for qualifier in &self.qualifiers {
            text.push(' ');
            text.push_str(qualifier.as_str());
        }
        text
    }

    fn add_qualifier(&mut self, qualifier: &Qualifier) {
        if !self.qualifiers.contains(qualifier) {
            self.qualifiers.push(qualifier.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    pub queries: Vec<RenderedQuery>,
    /// Keyed on the unqualified clause.
    pub threat_types: HashMap<String, ThreatType>,
}

#[derive(Debug, Default)]
struct TranslationContext {
    assigned_fields: HashSet<String>,
    threat_types: HashMap<String, ThreatType>,
}

struct Translator<'a> {
    profile: &'a dyn DialectProfile,
    mapper: &'a dyn FieldMapper,
    ctx: TranslationContext,
}

/// Renders `pattern` into the clauses of `dialect`. Every call starts from a fresh context.
pub fn translate(
    pattern: &FilterNode,
    dialect: Dialect,
    mapper: &dyn FieldMapper,
) -> Result<Translation> {
    render(pattern, dialect.profile(), mapper)
}

pub fn render(
    pattern: &FilterNode,
    profile: &dyn DialectProfile,
    mapper: &dyn FieldMapper,
) -> Result<Translation> {
    let mut translator = Translator {
        profile,
        mapper,
        ctx: TranslationContext::default(),
    };
    let queries = translator.observation(pattern)?;
    Ok(Translation {
        queries,
        threat_types: translator.ctx.threat_types,
    })
}

/// Translates and formats `pattern` into stamped payloads, using `now` for default windows.
pub fn translate_at(
    pattern: &FilterNode,
    dialect: Dialect,
    mapper: &dyn FieldMapper,
    time_range_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Vec<QueryPayload>> {
    let profile = dialect.profile();
    let translation = render(pattern, profile, mapper)?;
    let mut payloads = format_queries(profile, &translation, time_range_minutes, now)?;
    for payload in &mut payloads {
        payload.source = dialect.as_str().to_string();
    }
    debug!(%dialect, payloads = payloads.len(), "pattern translated");
    Ok(payloads)
}

/// End-to-end translation to the serialized payloads handed to `results`.
pub fn translate_pattern(
    pattern: &FilterNode,
    dialect: Dialect,
    mapper: &dyn FieldMapper,
    config: &ConnectorConfig,
) -> Result<Vec<String>> {
    translate_at(pattern, dialect, mapper, config.time_range_minutes, Utc::now())?
        .iter()
        .map(|payload| serde_json::to_string(payload).map_err(TranslateError::from))
        .collect()
}

impl Translator<'_> {
    fn observation(&mut self, node: &FilterNode) -> Result<Vec<RenderedQuery>> {
        match node {
            FilterNode::Pattern { root } => self.observation(root),
            FilterNode::Observation { comparison } => self.bare(comparison),
            FilterNode::Comparison { .. } | FilterNode::CombinedComparison { .. } => self.bare(node),
            FilterNode::QualifiedObservation {
                observation,
                qualifier,
            } => {
                let mut queries = self.observation(observation)?;
                if let Some(qualifier) = qualifier {
                    for query in &mut queries {
                        query.add_qualifier(qualifier);
                    }
                }
                Ok(queries)
            }
            FilterNode::CombinedObservation { op, left, right } => match op {
                ObservationOperator::FollowedBy => {
                    Err(TranslateError::UnsupportedOperator(op.to_string()))
                }
                ObservationOperator::Or => {
                    let mut queries = self.observation(left)?;
                    queries.extend(self.observation(right)?);
                    Ok(queries)
                }
                ObservationOperator::And => {
                    let lhs = self.observation(left)?;
                    let rhs = self.observation(right)?;
                    Ok(self.join(
                        lhs,
                        left.is_combined_comparison(),
                        rhs,
                        right.is_combined_comparison(),
                    ))
                }
            },
        }
    }

    fn bare(&mut self, node: &FilterNode) -> Result<Vec<RenderedQuery>> {
        let clause = self.expression(node)?;
        if clause.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![RenderedQuery::bare(clause)])
        }
    }

    /// Cartesian AND of two sides; an empty side leaves the other untouched.
    fn join(
        &self,
        lhs: Vec<RenderedQuery>,
        wrap_lhs: bool,
        rhs: Vec<RenderedQuery>,
        wrap_rhs: bool,
    ) -> Vec<RenderedQuery> {
        if lhs.is_empty() {
            return rhs;
        }
        if rhs.is_empty() {
            return lhs;
        }

        let and = self.profile.and_token();
        let mut joined = Vec::with_capacity(lhs.len() * rhs.len());
        for left in &lhs {
            for right in &rhs {
                let mut query = RenderedQuery::bare(format!(
                    "{}{and}{}",
                    parenthesize(&left.clause, wrap_lhs),
                    parenthesize(&right.clause, wrap_rhs)
                ));
                for qualifier in left.qualifiers.iter().chain(&right.qualifiers) {
                    query.add_qualifier(qualifier);
                }
                joined.push(query);
            }
        }
        joined
    }

    fn expression(&mut self, node: &FilterNode) -> Result<String> {
        match node {
            FilterNode::Comparison {
                object_path,
                operator,
                value,
                negated,
            } => self.comparison(object_path, *operator, value, *negated),
            FilterNode::CombinedComparison { op, left, right } => match op {
                BooleanOperator::Or => Err(TranslateError::UnsupportedOperator(op.to_string())),
                BooleanOperator::And => {
                    let lhs = self.expression(left)?;
                    let rhs = self.expression(right)?;
                    if lhs.is_empty() || rhs.is_empty() {
                        Ok(String::new())
                    } else {
                        Ok(format!("{lhs}{}{rhs}", self.profile.and_token()))
                    }
                }
            },
            other => Err(TranslateError::MalformedPattern(format!(
                "{} inside a comparison expression",
                node_kind(other)
            ))),
        }
    }

    fn comparison(
        &mut self,
        path: &ObjectPath,
        operator: ComparisonOperator,
        value: &Literal,
        negated: bool,
    ) -> Result<String> {
        let (object, field) = path.split()?;
        let natives = self
            .mapper
            .map_field(object, field)
            .ok_or_else(|| TranslateError::UnmappedField {
                object: object.to_string(),
                field: field.to_string(),
            })?;

        let conflicts: Vec<&str> = natives
            .iter()
            .filter(|native| self.ctx.assigned_fields.contains(native.as_str()))
            .map(String::as_str)
            .collect();
        if !conflicts.is_empty() {
            let fields = conflicts.join(", ");
            error!(field = path.as_str(), fields = %fields, "multiple criteria for one field");
            return Err(TranslateError::ConflictingCriteria {
                field: path.as_str().to_string(),
                fields,
            });
        }
        self.ctx.assigned_fields.extend(natives.iter().cloned());

        if negated {
            return Err(TranslateError::UnsupportedOperator(format!("NOT {operator}")));
        }
        let comparator = self
            .profile
            .comparator(operator)
            .ok_or_else(|| TranslateError::UnsupportedOperator(operator.to_string()))?;

        let raw = value.to_string();
        let literal = if operator == ComparisonOperator::Equal {
            raw.clone()
        } else {
            escape(&raw)
        };

        let reference_type = is_reference_field(field).then(|| classify(&raw));
        let mut parts = Vec::with_capacity(natives.len());
        for native in &natives {
            if let Some(value_type) = reference_type {
                let accepted = accepted_types(native);
                if !value_type.is_some_and(|kind| accepted.contains(&kind)) {
                    continue;
                }
            }
            let rewritten = self.profile.rewrite_value(native, &literal)?;
            parts.push(format!("{native}{comparator}{rewritten}"));
        }

        if parts.is_empty() {
            warn!(
                field = path.as_str(),
                natives = %natives.join(", "),
                value = %raw,
                "reference literal matches no accepted type; comparison dropped"
            );
            return Ok(String::new());
        }

        let clause = parts.join(self.profile.and_token());
        if let Some(threat_type) = self.profile.threat_type(object, field) {
            self.ctx.threat_types.insert(clause.clone(), threat_type);
        }
        Ok(clause)
    }
}

fn parenthesize(clause: &str, wrap: bool) -> String {
    if wrap {
        format!("({clause})")
    } else {
        clause.to_string()
    }
}

fn node_kind(node: &FilterNode) -> &'static str {
    match node {
        FilterNode::Comparison { .. } => "comparison",
        FilterNode::CombinedComparison { .. } => "combined comparison",
        FilterNode::Observation { .. } => "observation",
        FilterNode::QualifiedObservation { .. } => "qualified observation",
        FilterNode::CombinedObservation { .. } => "combined observation",
        FilterNode::Pattern { .. } => "pattern",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::JsonFieldMapper;
    use pretty_assertions::assert_eq;

    fn dns() -> &'static JsonFieldMapper {
        JsonFieldMapper::bundled(Dialect::DnsEvent)
    }

    fn observe(path: &str, value: &str) -> FilterNode {
        FilterNode::observe(FilterNode::equals(path, value))
    }

    fn clauses(translation: &Translation) -> Vec<String> {
        translation.queries.iter().map(RenderedQuery::text).collect()
    }

    #[test]
    fn renders_single_comparison() {
        let pattern = FilterNode::pattern(observe("ipv4-addr:value", "127.0.0.1"));
        let translation = translate(&pattern, Dialect::DnsEvent, dns()).unwrap();
        assert_eq!(clauses(&translation), vec!["qip=127.0.0.1"]);
    }

    #[test]
    fn rewrites_domain_and_severity() {
        let pattern = FilterNode::pattern(FilterNode::observe(FilterNode::and(
            FilterNode::equals("domain-name:value", "example.com"),
            FilterNode::equals("x-infoblox-dns-event:x_infoblox_severity", "HIGH"),
        )));
        let translation = translate(&pattern, Dialect::DnsEvent, dns()).unwrap();
        assert_eq!(clauses(&translation), vec!["qname=example.com.&threat_level=3"]);
    }

    #[test]
    fn same_native_field_twice_conflicts() {
        let pattern = FilterNode::pattern(FilterNode::observe(FilterNode::and(
            FilterNode::equals("ipv4-addr:value", "1.1.1.1"),
            FilterNode::equals("network-traffic:src_ref.value", "1.1.1.2"),
        )));
        let err = translate(&pattern, Dialect::DnsEvent, dns()).unwrap_err();
        assert!(
            matches!(err, TranslateError::ConflictingCriteria { ref fields, .. } if fields == "qip"),
            "{err}"
        );
    }

    #[test]
    fn non_equality_is_unsupported() {
        let pattern = FilterNode::pattern(FilterNode::observe(FilterNode::compare(
            "ipv4-addr:value",
            ComparisonOperator::NotEqual,
            "1.1.1.1",
        )));
        let err = translate(&pattern, Dialect::DnsEvent, dns()).unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedOperator(_)));
    }

    #[test]
    fn negation_and_or_comparisons_are_unsupported() {
        let negated = FilterNode::Comparison {
            object_path: ObjectPath::new("ipv4-addr:value"),
            operator: ComparisonOperator::Equal,
            value: Literal::from("1.1.1.1"),
            negated: true,
        };
        let err = translate(&FilterNode::observe(negated), Dialect::DnsEvent, dns()).unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedOperator(ref op) if op == "NOT Equal"));

        let or = FilterNode::CombinedComparison {
            op: BooleanOperator::Or,
            left: Box::new(FilterNode::equals("ipv4-addr:value", "1.1.1.1")),
            right: Box::new(FilterNode::equals("domain-name:value", "example.com")),
        };
        let err = translate(&FilterNode::observe(or), Dialect::DnsEvent, dns()).unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedOperator(_)));
    }

    #[test]
    fn followed_by_is_unsupported() {
        let pattern = FilterNode::combine(
            ObservationOperator::FollowedBy,
            observe("ipv4-addr:value", "1.1.1.1"),
            observe("domain-name:value", "example.com"),
        );
        let err = translate(&pattern, Dialect::DnsEvent, dns()).unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedOperator(ref op) if op == "FollowedBy"));
    }

    #[test]
    fn unmapped_field_fails() {
        let pattern = observe("file:name", "evil.exe");
        let err = translate(&pattern, Dialect::DnsEvent, dns()).unwrap_err();
        assert!(matches!(err, TranslateError::UnmappedField { .. }));
    }

    #[test]
    fn reference_field_filters_by_literal_type() {
        let domain = observe("x-infoblox-dns-event:extensions.dns-ext.question.domain_ref.value", "example.com");
        let translation = translate(&domain, Dialect::DnsEvent, dns()).unwrap();
        assert_eq!(clauses(&translation), vec!["qname=example.com."]);

        let mismatched = observe("network-traffic:src_ref.value", "example.com");
        let translation = translate(&mismatched, Dialect::DnsEvent, dns()).unwrap();
        assert!(translation.queries.is_empty());
    }

    #[test]
    fn reference_field_emits_every_matching_native() {
        let mapper = JsonFieldMapper::from_json(
            r#"{"network-traffic": {"fields": {"src_ref.value": ["qip", "value", "qname"]}}}"#,
        )
        .unwrap();
        let pattern = observe("network-traffic:src_ref.value", "10.0.0.0/8");
        let translation = translate(&pattern, Dialect::DnsEvent, &mapper).unwrap();
        assert_eq!(clauses(&translation), vec!["qip=10.0.0.0/8&value=10.0.0.0/8"]);
    }

    #[test]
    fn or_observations_render_separately() {
        let pattern = FilterNode::pattern(FilterNode::combine(
            ObservationOperator::Or,
            observe("ipv4-addr:value", "1.1.1.1"),
            observe("domain-name:value", "example.com"),
        ));
        let translation = translate(&pattern, Dialect::DnsEvent, dns()).unwrap();
        assert_eq!(clauses(&translation), vec!["qip=1.1.1.1", "qname=example.com."]);
    }

    #[test]
    fn and_observations_join_and_share_qualifier() {
        let window = Qualifier::between("t'2020-06-01T08:43:10Z'", "t'2020-08-31T10:43:10Z'");
        let pattern = FilterNode::combine(
            ObservationOperator::And,
            FilterNode::qualify(observe("ipv4-addr:value", "1.1.1.1"), window.clone()),
            FilterNode::qualify(
                FilterNode::observe(FilterNode::and(
                    FilterNode::equals("domain-name:value", "example.com"),
                    FilterNode::equals("x-infoblox-dns-event:network", "BloxOne Endpoint"),
                )),
                window.clone(),
            ),
        );
        let translation = translate(&pattern, Dialect::DnsEvent, dns()).unwrap();
        assert_eq!(
            translation.queries,
            vec![RenderedQuery {
                clause: "qip=1.1.1.1&(qname=example.com.&network=BloxOne Endpoint)".into(),
                qualifiers: vec![window],
            }]
        );
    }

    #[test]
    fn differing_qualifiers_are_both_kept() {
        let pattern = FilterNode::combine(
            ObservationOperator::And,
            FilterNode::qualify(
                observe("ipv4-addr:value", "1.1.1.1"),
                Qualifier::between("t'2020-06-01T08:43:10Z'", "t'2020-08-31T10:43:10Z'"),
            ),
            FilterNode::qualify(
                observe("domain-name:value", "example.com"),
                Qualifier::between("t'2021-06-01T08:43:10Z'", "t'2021-08-31T10:43:10Z'"),
            ),
        );
        let translation = translate(&pattern, Dialect::DnsEvent, dns()).unwrap();
        assert_eq!(translation.queries[0].qualifiers.len(), 2);
    }

    #[test]
    fn dropped_side_leaves_other_verbatim() {
        let pattern = FilterNode::combine(
            ObservationOperator::And,
            observe("network-traffic:src_ref.value", "example.com"),
            observe("domain-name:value", "example.com"),
        );
        let translation = translate(&pattern, Dialect::DnsEvent, dns()).unwrap();
        assert_eq!(clauses(&translation), vec!["qname=example.com."]);
    }

    #[test]
    fn records_threat_types_on_unqualified_clause() {
        let pattern = FilterNode::qualify(
            observe("domain-name:value", "example.com"),
            Qualifier::between("t'2020-06-01T08:43:10Z'", "t'2020-08-31T10:43:10Z'"),
        );
        let translation = translate(
            &pattern,
            Dialect::Dossier,
            JsonFieldMapper::bundled(Dialect::Dossier),
        )
        .unwrap();
        assert_eq!(
            translation.threat_types.get("value=example.com"),
            Some(&ThreatType::Host)
        );
    }

    #[test]
    fn observation_inside_comparison_is_malformed() {
        let pattern = FilterNode::observe(FilterNode::and(
            FilterNode::equals("ipv4-addr:value", "1.1.1.1"),
            observe("domain-name:value", "example.com"),
        ));
        let err = translate(&pattern, Dialect::DnsEvent, dns()).unwrap_err();
        assert!(matches!(err, TranslateError::MalformedPattern(_)));
    }

    #[test]
    fn contexts_do_not_leak_between_calls() {
        let pattern = observe("ipv4-addr:value", "1.1.1.1");
        translate(&pattern, Dialect::DnsEvent, dns()).unwrap();
        assert!(translate(&pattern, Dialect::DnsEvent, dns()).is_ok());
    }
}
