//! Users, groups and permission grants

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{map_unique_violation, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, User},
};

const USER_COLUMNS: &str = "id, username, password_hash, first_name, last_name, email, is_active";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, first_name, last_name, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || format!("Username '{}' is taken", user.username)))
    }

    async fn groups(&self, user_id: i32) -> AppResult<Vec<String>> {
        let groups: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT g.name
            FROM user_groups ug
            JOIN groups g ON g.id = ug.group_id
            WHERE ug.user_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn permissions(&self, user_id: i32) -> AppResult<Vec<String>> {
        let codenames: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT codename FROM user_permissions WHERE user_id = $1
            UNION
            SELECT gp.codename
            FROM user_groups ug
            JOIN group_permissions gp ON gp.group_id = ug.group_id
            WHERE ug.user_id = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(codenames)
    }

    async fn ensure_group(&self, name: &str, permissions: &[&str]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let group_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO groups (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        let codenames: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO group_permissions (group_id, codename)
            SELECT $1, UNNEST($2::varchar[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(&codenames)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_to_group(&self, user_id: i32, group: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_id)
            SELECT $1, id FROM groups WHERE name = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE name = $1)")
                    .bind(group)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(AppError::NotFound(format!("Group '{}' not found", group)));
            }
        }
        Ok(())
    }

    async fn grant_permission(&self, user_id: i32, codename: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_permissions (user_id, codename) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(codename)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
