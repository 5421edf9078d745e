//! Entity dependency graph and load/clear ordering.
//!
//! # Invariants
//! - `DEPENDENCIES` lists every `EntityKind` exactly once.
//! - In `load_order()` every kind appears after all of its predecessors.
//! - Ties are broken by declaration order, so the plan is deterministic.
//! - `clear_order()` is the exact reverse of `load_order()`.

use crate::model::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Entity kind → kinds whose rows it references through foreign keys.
pub const DEPENDENCIES: &[(EntityKind, &[EntityKind])] = &[
    (EntityKind::User, &[]),
    (EntityKind::Profile, &[EntityKind::User]),
    (EntityKind::Funder, &[]),
    (EntityKind::Tag, &[]),
    (
        EntityKind::Project,
        &[EntityKind::Funder, EntityKind::User, EntityKind::Tag],
    ),
    (EntityKind::Space, &[]),
    (EntityKind::Post, &[EntityKind::Space, EntityKind::User]),
    (EntityKind::Comment, &[EntityKind::Post, EntityKind::User]),
    (EntityKind::Annotation, &[EntityKind::Project, EntityKind::User]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A kind is listed more than once.
    DuplicateKind(EntityKind),
    /// A predecessor is not itself listed in the graph.
    UnknownPredecessor {
        kind: EntityKind,
        predecessor: EntityKind,
    },
    /// These kinds depend on each other in a cycle.
    Cycle(Vec<EntityKind>),
}

impl Display for PlanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKind(kind) => write!(f, "entity kind `{kind}` listed twice"),
            Self::UnknownPredecessor { kind, predecessor } => write!(
                f,
                "entity kind `{kind}` depends on unlisted kind `{predecessor}`"
            ),
            Self::Cycle(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|kind| kind.as_str()).collect();
                write!(f, "dependency cycle between: {}", names.join(", "))
            }
        }
    }
}

impl Error for PlanError {}

/// Topologically sorts `graph` (Kahn's algorithm).
pub fn plan(graph: &[(EntityKind, &[EntityKind])]) -> Result<Vec<EntityKind>, PlanError> {
    for (index, (kind, predecessors)) in graph.iter().enumerate() {
        if graph[..index].iter().any(|(other, _)| other == kind) {
            return Err(PlanError::DuplicateKind(*kind));
        }
        for predecessor in predecessors.iter() {
            if !graph.iter().any(|(other, _)| other == predecessor) {
                return Err(PlanError::UnknownPredecessor {
                    kind: *kind,
                    predecessor: *predecessor,
                });
            }
        }
    }

    let mut placed = vec![false; graph.len()];
    let mut order = Vec::with_capacity(graph.len());
    while order.len() < graph.len() {
        let next = graph.iter().enumerate().position(|(index, (_, predecessors))| {
            !placed[index] && predecessors.iter().all(|pred| order.contains(pred))
        });
        match next {
            Some(index) => {
                placed[index] = true;
                order.push(graph[index].0);
            }
            None => {
                let stuck = graph
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| !placed[*index])
                    .map(|(_, (kind, _))| *kind)
                    .collect();
                return Err(PlanError::Cycle(stuck));
            }
        }
    }
    Ok(order)
}

/// Order in which entity kinds must be created.
pub fn load_order() -> Result<Vec<EntityKind>, PlanError> {
    plan(DEPENDENCIES)
}

/// Order in which entity kinds must be cleared: reverse of `load_order`.
pub fn clear_order() -> Result<Vec<EntityKind>, PlanError> {
    let mut order = load_order()?;
    order.reverse();
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::{clear_order, load_order, plan, PlanError, DEPENDENCIES};
    use crate::model::EntityKind;

    #[test]
    fn load_order_matches_declared_dependency_chain() {
        assert_eq!(
            load_order().unwrap(),
            vec![
                EntityKind::User,
                EntityKind::Profile,
                EntityKind::Funder,
                EntityKind::Tag,
                EntityKind::Project,
                EntityKind::Space,
                EntityKind::Post,
                EntityKind::Comment,
                EntityKind::Annotation,
            ]
        );
    }

    #[test]
    fn every_kind_follows_its_predecessors() {
        let order = load_order().unwrap();
        for (kind, predecessors) in DEPENDENCIES {
            let position = order.iter().position(|k| k == kind).unwrap();
            for predecessor in predecessors.iter() {
                let before = order.iter().position(|k| k == predecessor).unwrap();
                assert!(before < position, "{predecessor} must precede {kind}");
            }
        }
        assert_eq!(order.len(), EntityKind::ALL.len());
    }

    #[test]
    fn clear_order_is_reverse_of_load_order() {
        let mut load = load_order().unwrap();
        load.reverse();
        assert_eq!(clear_order().unwrap(), load);
    }

    #[test]
    fn declaration_order_does_not_have_to_be_topological() {
        let graph: &[(EntityKind, &[EntityKind])] = &[
            (EntityKind::Comment, &[EntityKind::Post]),
            (EntityKind::Post, &[EntityKind::Space]),
            (EntityKind::Space, &[]),
        ];
        assert_eq!(
            plan(graph).unwrap(),
            vec![EntityKind::Space, EntityKind::Post, EntityKind::Comment]
        );
    }

    #[test]
    fn cycles_are_reported() {
        let graph: &[(EntityKind, &[EntityKind])] = &[
            (EntityKind::User, &[]),
            (EntityKind::Post, &[EntityKind::Comment]),
            (EntityKind::Comment, &[EntityKind::Post]),
        ];
        assert_eq!(
            plan(graph),
            Err(PlanError::Cycle(vec![EntityKind::Post, EntityKind::Comment]))
        );
    }

    #[test]
    fn unknown_predecessor_is_rejected() {
        let graph: &[(EntityKind, &[EntityKind])] = &[(EntityKind::Post, &[EntityKind::Space])];
        assert!(matches!(
            plan(graph),
            Err(PlanError::UnknownPredecessor { .. })
        ));
    }
}
