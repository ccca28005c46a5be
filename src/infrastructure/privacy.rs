// Write access rules - who may change what

use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;
use crate::models::RecipeRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyOperation {
    Update,
    Delete,
}

impl PrivacyOperation {
    fn verb(&self) -> &'static str {
        match self {
            PrivacyOperation::Update => "edit",
            PrivacyOperation::Delete => "delete",
        }
    }
}

/// Only the author of a recipe or a staff user may modify it.
///
/// Anonymous viewers get `Unauthorized`; authenticated non-authors get `Forbidden`.
pub fn check_recipe_write(
    vc: &ViewerContext,
    recipe: &RecipeRow,
    operation: PrivacyOperation,
) -> AppResult<()> {
    let user = vc.require_user()?;
    if user.is_staff || user.id == recipe.author_id {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Only the author can {} recipe {}",
        operation.verb(),
        recipe.id
    )))
}

/// Catalog maintenance is reserved to staff.
pub fn check_staff(vc: &ViewerContext) -> AppResult<()> {
    let user = vc.require_user()?;
    if user.is_staff {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ))
    }
}
