/// Key-construction helpers shared by the Redis-backed store.
///
/// Every key is rooted at `{prefix}:{service}` so multiple deployments (and
/// test namespaces) can share one Redis instance without colliding.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    /// Document key for a single record.
    pub fn entity(&self, collection: &str, entity_id: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.service, collection, entity_id)
    }

    /// Set of all record ids in a collection.
    pub fn index(&self, collection: &str) -> String {
        format!("{}:{}:{}:index", self.prefix, self.service, collection)
    }

    /// Pub/sub channel carrying change notifications for a collection.
    pub fn channel(&self, collection: &str) -> String {
        format!("{}:{}:{}:events", self.prefix, self.service, collection)
    }

    /// List key holding the ordered messages of one chat.
    pub fn messages(&self, chat_id: &str) -> String {
        format!("{}:{}:messages:{}", self.prefix, self.service, chat_id)
    }

    /// List key holding the ordered comments of one post.
    pub fn comments(&self, post_id: &str) -> String {
        format!("{}:{}:comments:{}", self.prefix, self.service, post_id)
    }
}
