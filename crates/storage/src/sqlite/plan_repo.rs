use study_core::model::{Plan, PlanId, Task, TaskId, TaskStatus, UserId};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, map_task_row, plan_id_from_i64, ser, task_id_from_i64, topics_from_json,
    topics_to_json, user_id_from_i64,
};
use crate::repository::{NewTaskRecord, PlanRepository, StorageError};

async fn load_tasks(db: &mut SqliteConnection, plan_id: i64) -> Result<Vec<Task>, StorageError> {
    let rows = sqlx::query(
        r"
            SELECT id, plan_id, topic, date, title, description, status, order_index
            FROM tasks
            WHERE plan_id = ?1
            ORDER BY id ASC
        ",
    )
    .bind(plan_id)
    .fetch_all(&mut *db)
    .await
    .map_err(conn)?;

    rows.iter().map(map_task_row).collect()
}

async fn map_plan_row(
    db: &mut SqliteConnection,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Plan, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let topics: String = row.try_get("topics").map_err(ser)?;
    let tasks = load_tasks(db, id).await?;

    Plan::from_persisted(
        plan_id_from_i64(id)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        topics_from_json(&topics)?,
        row.try_get("start_date").map_err(ser)?,
        row.try_get("target_date").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        tasks,
    )
    .map_err(ser)
}

async fn fetch_plan(
    db: &mut SqliteConnection,
    user: i64,
    id: i64,
) -> Result<Option<Plan>, StorageError> {
    let row = sqlx::query(
        r"
            SELECT id, user_id, title, topics, start_date, target_date, created_at
            FROM plans
            WHERE id = ?1 AND user_id = ?2
        ",
    )
    .bind(id)
    .bind(user)
    .fetch_optional(&mut *db)
    .await
    .map_err(conn)?;

    match row {
        Some(row) => Ok(Some(map_plan_row(db, &row).await?)),
        None => Ok(None),
    }
}

#[async_trait::async_trait]
impl PlanRepository for SqliteRepository {
    async fn insert_plan(&self, plan: &Plan) -> Result<PlanId, StorageError> {
        let user_id = id_i64("user_id", plan.user_id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                INSERT INTO plans (user_id, title, topics, start_date, target_date, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(user_id)
        .bind(plan.title())
        .bind(topics_to_json(plan.topics())?)
        .bind(plan.start_date())
        .bind(plan.target_date())
        .bind(plan.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let plan_id = res.last_insert_rowid();

        for task in plan.tasks() {
            sqlx::query(
                r"
                    INSERT INTO tasks (plan_id, topic, date, title, description, status, order_index)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(plan_id)
            .bind(task.topic())
            .bind(task.date())
            .bind(task.title())
            .bind(task.description())
            .bind(task.status().as_str())
            .bind(i64::from(task.order_index()))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(plan_id, user_id, "inserted plan");
        plan_id_from_i64(plan_id)
    }

    async fn get_plan(&self, user: UserId, id: PlanId) -> Result<Option<Plan>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        fetch_plan(
            &mut *db,
            id_i64("user_id", user.value())?,
            id_i64("plan_id", id.value())?,
        )
        .await
    }

    async fn list_plans(&self, user: UserId) -> Result<Vec<Plan>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        let rows = sqlx::query(
            r"
                SELECT id, user_id, title, topics, start_date, target_date, created_at
                FROM plans
                WHERE user_id = ?1
                ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .fetch_all(&mut *db)
        .await
        .map_err(conn)?;

        let mut plans = Vec::with_capacity(rows.len());
        for row in &rows {
            plans.push(map_plan_row(&mut *db, row).await?);
        }
        Ok(plans)
    }

    async fn delete_plan(&self, user: UserId, id: PlanId) -> Result<(), StorageError> {
        let user_id = id_i64("user_id", user.value())?;
        let plan_id = id_i64("plan_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let owned = sqlx::query("SELECT 1 FROM plans WHERE id = ?1 AND user_id = ?2")
            .bind(plan_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if owned.is_none() {
            return Err(StorageError::NotFound);
        }

        let tasks = sqlx::query("DELETE FROM tasks WHERE plan_id = ?1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query("DELETE FROM plans WHERE id = ?1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        tracing::debug!(plan_id, tasks = tasks.rows_affected(), "deleted plan");
        Ok(())
    }

    async fn insert_tasks(
        &self,
        user: UserId,
        plan_id: PlanId,
        tasks: Vec<NewTaskRecord>,
    ) -> Result<Vec<Task>, StorageError> {
        let user_id = id_i64("user_id", user.value())?;
        let plan_key = id_i64("plan_id", plan_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let owned = sqlx::query("SELECT 1 FROM plans WHERE id = ?1 AND user_id = ?2")
            .bind(plan_key)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if owned.is_none() {
            return Err(StorageError::NotFound);
        }

        let mut created = Vec::with_capacity(tasks.len());
        for record in tasks {
            let res = sqlx::query(
                r"
                    INSERT INTO tasks (plan_id, topic, date, title, description, status, order_index)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(plan_key)
            .bind(&record.topic)
            .bind(record.date)
            .bind(&record.title)
            .bind(record.description.as_deref())
            .bind(TaskStatus::Pending.as_str())
            .bind(i64::from(record.order_index))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            created.push(Task::from_persisted(
                task_id_from_i64(res.last_insert_rowid())?,
                plan_id,
                record.topic,
                record.date,
                record.title,
                record.description,
                TaskStatus::Pending,
                record.order_index,
            ));
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(plan_id = plan_key, count = created.len(), "inserted tasks");
        Ok(created)
    }

    async fn set_task_status(
        &self,
        user: UserId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Plan, StorageError> {
        let user_id = id_i64("user_id", user.value())?;
        let task_key = id_i64("task_id", task_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let plan_id: i64 = sqlx::query(
            r"
                SELECT t.plan_id
                FROM tasks t
                JOIN plans p ON p.id = t.plan_id
                WHERE t.id = ?1 AND p.user_id = ?2
            ",
        )
        .bind(task_key)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?
        .try_get("plan_id")
        .map_err(ser)?;

        sqlx::query("UPDATE tasks SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(task_key)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        let plan = fetch_plan(&mut *tx, user_id, plan_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        tx.commit().await.map_err(conn)?;
        Ok(plan)
    }
}
