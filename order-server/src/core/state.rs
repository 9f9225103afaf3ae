use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtService;
use crate::carts::CartManager;
use crate::core::{BackgroundTasks, Config, TaskKind};
use crate::db::OrderStore;
use crate::menu::MenuCatalog;
use crate::message::MessageBus;
use crate::orders::{OrderFulfillment, OrderQueries, OrderStatusHandler};
use crate::tickets::{DelayMonitor, TicketPublisher};
use crate::utils::{Clock, SystemClock};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | store | redb 实体存储 |
/// | bus | 进程内消息总线 |
/// | jwt | JWT 验证服务 |
/// | clock | 壁钟时间来源（可注入） |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: OrderStore,
    pub bus: Arc<MessageBus>,
    pub jwt: Arc<JwtService>,
    pub clock: Arc<dyn Clock>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 确保工作目录存在并打开数据库。
    ///
    /// # Panics
    ///
    /// 工作目录或数据库初始化失败时 panic
    pub fn initialize(config: &Config) -> Self {
        let db_path = config.db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create database directory");
        }
        let store = OrderStore::open(&db_path).expect("Failed to open database");

        tracing::info!(path = %db_path.display(), "Database opened");

        Self {
            config: config.clone(),
            store,
            bus: Arc::new(MessageBus::new()),
            jwt: Arc::new(JwtService::new(config.jwt.clone())),
            clock: Arc::new(SystemClock),
        }
    }

    // ========== Service Accessors ==========

    pub fn catalog(&self) -> MenuCatalog {
        MenuCatalog::new(self.store.clone(), self.clock.clone())
    }

    pub fn carts(&self) -> CartManager {
        CartManager::new(self.store.clone(), self.clock.clone())
    }

    pub fn fulfillment(&self) -> OrderFulfillment {
        OrderFulfillment::new(
            self.store.clone(),
            TicketPublisher::new(self.bus.clone()),
            self.clock.clone(),
        )
    }

    pub fn order_status(&self) -> OrderStatusHandler {
        OrderStatusHandler::new(self.store.clone(), self.clock.clone())
    }

    pub fn order_queries(&self) -> OrderQueries {
        OrderQueries::new(self.store.clone(), self.clock.clone())
    }

    // ========== Background Tasks ==========

    /// 启动后台任务（进程生命周期内运行）
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let monitor = DelayMonitor::new(
            self.store.clone(),
            self.bus.clone(),
            self.clock.clone(),
            Duration::from_secs(self.config.ticket_poll_interval_secs),
            tasks.shutdown_token(),
        );
        tasks.spawn("delay_monitor", TaskKind::Worker, monitor.run());

        tasks
    }
}
