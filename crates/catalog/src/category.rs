use serde::{Deserialize, Serialize};

use vexo_core::{CategoryId, DomainError, DomainResult, Entity};

/// A named grouping of products. Names are unique store-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn create(new: NewCategory) -> Self {
        Self {
            id: CategoryId::new(),
            name: new.name,
        }
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        let new = NewCategory {
            name: "  ".to_string(),
        };
        assert!(new.validate().is_err());
    }

    #[test]
    fn creates_with_fresh_id() {
        let a = Category::create(NewCategory {
            name: "Lighting".to_string(),
        });
        let b = Category::create(NewCategory {
            name: "Lighting".to_string(),
        });
        assert_ne!(a.id, b.id);
    }
}
