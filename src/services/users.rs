use super::{clean, is_valid_email, lenient_bool, nullable, views::ProductBrief};
use crate::{
    auth::{hash_password, verify_password, AuthService, CurrentUser, Role},
    db::{
        count_grouped, fetch_page, find_by_ids, search_term, DbPool, PageRequest, Pagination,
        SearchBuilder, SortDirection, Sorting,
    },
    entities::{product, stock_movement, user},
    errors::{classify_db_err, ServiceError, StoreContext, StoreErrorKind, StoreResultExt},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

const MIN_PASSWORD_LEN: usize = 6;
const RECENT_MOVEMENTS: u64 = 10;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Admin-only account creation
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: Option<bool>,
}

/// Partial account update; `role` and `isActive` need ADMIN
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub last_name: Option<Option<String>>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum UserSort {
    Username,
    Email,
    Role,
    CreatedAt,
    UpdatedAt,
    FirstName,
    LastName,
}

impl UserSort {
    fn column(self) -> user::Column {
        match self {
            UserSort::Username => user::Column::Username,
            UserSort::Email => user::Column::Email,
            UserSort::Role => user::Column::Role,
            UserSort::CreatedAt => user::Column::CreatedAt,
            UserSort::UpdatedAt => user::Column::UpdatedAt,
            UserSort::FirstName => user::Column::FirstName,
            UserSort::LastName => user::Column::LastName,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_by: UserSort,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_order: SortDirection,
}

impl Default for UserListQuery {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            is_active: None,
            sort_by: UserSort::CreatedAt,
            sort_order: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementCount {
    pub stock_movements: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithCount {
    #[serde(flatten)]
    pub user: user::Model,
    #[serde(rename = "_count")]
    pub count: MovementCount,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserPage {
    pub users: Vec<UserWithCount>,
    pub pagination: Pagination,
    pub filters: UserListQuery,
    pub sorting: Sorting,
}

/// Movement summary on the user detail view
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMovement {
    pub id: i32,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub product: Option<ProductBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: user::Model,
    pub stock_movements: Vec<UserMovement>,
    #[serde(rename = "_count")]
    pub count: MovementCount,
}

/// Accounts, sign-in and registration
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, auth: Arc<AuthService>) -> Self {
        Self { db_pool, auth }
    }

    /// Checks credentials and issues a session token
    #[instrument(skip_all, fields(username = ?request.username))]
    pub async fn login(
        &self,
        request: LoginRequest,
    ) -> Result<(user::Model, String), ServiceError> {
        const INVALID: &str = "Invalid username or password";

        let (username, password) = match (clean(request.username), request.password) {
            (Some(username), Some(password)) if !password.is_empty() => (username, password),
            _ => {
                return Err(ServiceError::ValidationError(
                    "Username and password are required".to_string(),
                ))
            }
        };

        let ctx = StoreContext::new("Login failed");
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .one(&*self.db_pool)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID.to_string()))?;

        if !verify_password(&password, &user.password_hash) {
            warn!(user_id = user.id, "Rejected login with wrong password");
            return Err(ServiceError::Unauthorized(INVALID.to_string()));
        }
        if !user.is_active {
            return Err(ServiceError::Unauthorized(
                "Account is deactivated".to_string(),
            ));
        }

        let token = self.auth.issue_token(&user)?;
        info!(user_id = user.id, "User logged in");
        Ok((user, token))
    }

    /// Self-service sign-up; always creates a USER
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<(user::Model, String), ServiceError> {
        let user = self
            .insert_user(
                NewUser {
                    username: request.username,
                    email: request.email,
                    password: request.password,
                    role: Role::User,
                    first_name: request.first_name,
                    last_name: request.last_name,
                    is_active: true,
                },
                "Registration failed",
            )
            .await?;

        let token = self.auth.issue_token(&user)?;
        info!(user_id = user.id, "User registered");
        Ok((user, token))
    }

    /// Lists accounts with their movement counts
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: UserListQuery,
        page: PageRequest,
    ) -> Result<UserPage, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch users");

        let mut select = user::Entity::find();
        if let Some(term) = search_term(query.search.as_deref()) {
            if let Some(condition) = SearchBuilder::new()
                .add_like(user::Column::Username, term)
                .add_like(user::Column::Email, term)
                .add_like(user::Column::FirstName, term)
                .add_like(user::Column::LastName, term)
                .build()
            {
                select = select.filter(condition);
            }
        }
        if let Some(role) = query.role.as_deref() {
            select = select.filter(user::Column::Role.eq(role));
        }
        if let Some(is_active) = query.is_active {
            select = select.filter(user::Column::IsActive.eq(is_active));
        }
        let select = select
            .order_by(query.sort_by.column(), query.sort_order.order())
            .order_by(user::Column::Id, query.sort_order.order());

        let (rows, total) = fetch_page(select, db, &page).await.map_store_err(&ctx)?;
        let counts = count_grouped::<stock_movement::Entity, _>(
            db,
            stock_movement::Column::UserId,
            rows.iter().map(|u| u.id),
        )
        .await
        .map_store_err(&ctx)?;

        let users = rows
            .into_iter()
            .map(|user| UserWithCount {
                count: MovementCount {
                    stock_movements: counts.get(&user.id).copied().unwrap_or(0),
                },
                user,
            })
            .collect();

        Ok(UserPage {
            users,
            pagination: Pagination::new(&page, total),
            sorting: Sorting::new(query.sort_by, query.sort_order),
            filters: query,
        })
    }

    /// Creates an account with any role
    #[instrument(skip_all, fields(actor_id = actor.id))]
    pub async fn create(
        &self,
        actor: &CurrentUser,
        request: CreateUserRequest,
    ) -> Result<user::Model, ServiceError> {
        let role = match request.role.as_deref().map(str::trim) {
            None | Some("") => Role::User,
            Some(raw) => parse_role(raw)?,
        };

        let user = self
            .insert_user(
                NewUser {
                    username: request.username,
                    email: request.email,
                    password: request.password,
                    role,
                    first_name: request.first_name,
                    last_name: request.last_name,
                    is_active: request.is_active.unwrap_or(true),
                },
                "Failed to create user",
            )
            .await?;

        info!(user_id = user.id, actor_id = actor.id, role = %role, "User created");
        Ok(user)
    }

    /// Gets an account with its latest movements; self or MANAGER+
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn get(&self, actor: &CurrentUser, id: i32) -> Result<UserDetail, ServiceError> {
        ensure_self_or_manager(actor, id)?;

        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch user");
        let user = self.find(id, &ctx).await?;

        let total = user
            .find_related(stock_movement::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;
        let movements = user
            .find_related(stock_movement::Entity)
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .limit(RECENT_MOVEMENTS)
            .all(db)
            .await
            .map_store_err(&ctx)?;
        let products = find_by_ids::<product::Entity, _, _>(
            db,
            product::Column::Id,
            movements.iter().map(|m| m.product_id),
            |p| p.id,
        )
        .await
        .map_store_err(&ctx)?;

        let stock_movements = movements
            .into_iter()
            .map(|m| UserMovement {
                product: products.get(&m.product_id).map(ProductBrief::from),
                id: m.id,
                movement_type: m.movement_type,
                quantity: m.quantity,
                created_at: m.created_at,
            })
            .collect();

        Ok(UserDetail {
            user,
            stock_movements,
            count: MovementCount {
                stock_movements: total,
            },
        })
    }

    /// Applies a partial update; self or MANAGER+, role/status changes ADMIN only
    #[instrument(skip_all, fields(actor_id = actor.id, user_id = id))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: i32,
        request: UpdateUserRequest,
    ) -> Result<user::Model, ServiceError> {
        ensure_self_or_manager(actor, id)?;

        let ctx = StoreContext::new("Failed to update user")
            .on_unique("Email already exists")
            .on_not_found("User not found");
        let existing = self.find(id, &ctx).await?;
        let mut active = existing.into_active_model();

        if let Some(email) = request.email {
            let email = email.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(ServiceError::ValidationError(
                    "Invalid email format".to_string(),
                ));
            }
            active.email = Set(email);
        }
        if let Some(password) = request.password {
            active.password_hash = Set(hash_checked_password(&password)?);
        }
        if let Some(first_name) = request.first_name {
            active.first_name = Set(clean(first_name));
        }
        if let Some(last_name) = request.last_name {
            active.last_name = Set(clean(last_name));
        }
        if let Some(role) = request.role {
            if !actor.is_admin() {
                return Err(ServiceError::Forbidden(
                    "Only administrators can change user roles".to_string(),
                ));
            }
            active.role = Set(parse_role(&role)?.to_string());
        }
        if let Some(is_active) = request.is_active {
            if !actor.is_admin() {
                return Err(ServiceError::Forbidden(
                    "Only administrators can change user status".to_string(),
                ));
            }
            active.is_active = Set(is_active);
        }

        let user = active
            .update(&*self.db_pool)
            .await
            .map_store_err(&ctx)?;
        info!(user_id = user.id, actor_id = actor.id, "User updated");
        Ok(user)
    }

    /// Deletes an account without movement history; never the caller's own
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn delete(&self, actor: &CurrentUser, id: i32) -> Result<(), ServiceError> {
        if actor.id == id {
            return Err(ServiceError::ValidationError(
                "Cannot delete your own account".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to delete user")
            .on_foreign_key("Cannot delete user due to existing references")
            .on_not_found("User not found");
        let user = self.find(id, &ctx).await?;

        let movements = user
            .find_related(stock_movement::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;
        if movements > 0 {
            return Err(ServiceError::HasDependents {
                message: "Cannot delete user with existing stock movement records".to_string(),
                details: Some(format!(
                    "This user has {} stock movement records",
                    movements
                )),
                count: movements,
            });
        }

        user.delete(db).await.map_store_err(&ctx)?;
        info!(user_id = id, actor_id = actor.id, "User deleted");
        Ok(())
    }

    async fn find(&self, id: i32, ctx: &StoreContext) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_store_err(ctx)?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    async fn insert_user(&self, new: NewUser, failure: &str) -> Result<user::Model, ServiceError> {
        let (username, email, password) = match (
            clean(new.username),
            clean(new.email),
            new.password.filter(|p| !p.is_empty()),
        ) {
            (Some(username), Some(email), Some(password)) => (username, email, password),
            _ => {
                return Err(ServiceError::ValidationError(
                    "Username, email, and password are required".to_string(),
                ))
            }
        };

        let email = email.to_lowercase();
        if !is_valid_email(&email) {
            return Err(ServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        let password_hash = hash_checked_password(&password)?;

        let db = &*self.db_pool;
        let ctx = StoreContext::new(failure);
        let taken = user::Entity::find()
            .filter(
                user::Column::Username
                    .eq(username.as_str())
                    .or(user::Column::Email.eq(email.as_str())),
            )
            .one(db)
            .await
            .map_store_err(&ctx)?;
        if let Some(taken) = taken {
            return Err(if taken.username == username {
                ServiceError::Conflict("Username already exists".to_string())
            } else {
                ServiceError::Conflict("Email already exists".to_string())
            });
        }

        user::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(new.role.to_string()),
            is_active: Set(new.is_active),
            first_name: Set(clean(new.first_name)),
            last_name: Set(clean(new.last_name)),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|err| user_conflict(err, &ctx))
    }
}

/// Fields shared by registration and admin creation
struct NewUser {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Role,
    first_name: Option<String>,
    last_name: Option<String>,
    is_active: bool,
}

fn ensure_self_or_manager(actor: &CurrentUser, id: i32) -> Result<(), ServiceError> {
    if actor.id == id || actor.is_privileged() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Insufficient permissions".to_string()))
    }
}

fn parse_role(raw: &str) -> Result<Role, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::ValidationError("Invalid role".to_string()))
}

fn hash_checked_password(password: &str) -> Result<String, ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::ValidationError(
            "Password must be at least 6 characters long".to_string(),
        ));
    }
    hash_password(password)
}

/// Names the duplicated column when a concurrent insert wins the race.
fn user_conflict(err: DbErr, ctx: &StoreContext) -> ServiceError {
    match classify_db_err(&err) {
        StoreErrorKind::UniqueViolation(target) if target.contains("username") => {
            ServiceError::Conflict("Username already exists".to_string())
        }
        StoreErrorKind::UniqueViolation(target) if target.contains("email") => {
            ServiceError::Conflict("Email already exists".to_string())
        }
        StoreErrorKind::UniqueViolation(_) => {
            ServiceError::Conflict("User already exists".to_string())
        }
        _ => ctx.translate(err),
    }
}
