//! Agent identity types for capability discovery.

use serde::{Deserialize, Serialize};

/// A remote agent's self-description
///
/// The identity document lists the skills an agent can perform. A bridge
/// treats it as an immutable snapshot taken at construction time; it is
/// never re-fetched automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Unique identifier for the agent
    pub id: String,

    /// Human-readable name of the agent
    pub name: String,

    /// Description of the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Skills the agent can perform, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<Skill>,
}

impl AgentIdentity {
    /// Create a new agent identity with required fields
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            skills: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a skill
    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Look up a skill by id
    pub fn skill(&self, id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == id)
    }
}

/// One named capability within an agent identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Unique identifier within the owning identity
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Description of what the skill does
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Schema-like description of accepted parameters; absent means the
    /// skill accepts free-form text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl Skill {
    /// Create a new skill
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            parameters: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the parameter schema
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_builder() {
        let identity = AgentIdentity::new("calc-agent", "Calculator Agent")
            .with_description("Does arithmetic")
            .with_skill(
                Skill::new("calculator", "Calculator")
                    .with_parameters(json!({"type": "object"})),
            );

        assert_eq!(identity.id, "calc-agent");
        assert_eq!(identity.skills.len(), 1);
        assert!(identity.skill("calculator").is_some());
        assert!(identity.skill("missing").is_none());
    }

    #[test]
    fn test_identity_serialization_omits_absent_fields() {
        let identity = AgentIdentity::new("a", "A");
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json, json!({"id": "a", "name": "A"}));
    }
}
