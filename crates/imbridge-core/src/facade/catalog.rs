//! The fixed catalog of database methods the facade exposes.
//!
//! Each entry maps an exposed name onto the remote method it invokes. A few
//! exposed names are aliases (`updateConversation` and
//! `updateConversationForSync` both invoke `updateColumnsConversation`).

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MethodDescriptor {
    /// Name callers use.
    pub name: &'static str,
    /// Method invoked on the worker.
    pub remote: &'static str,
    /// Whether the response is handed back as a JSON string.
    pub stringify: bool,
}

impl MethodDescriptor {
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            remote: name,
            stringify: true,
        }
    }

    pub const fn aliased(name: &'static str, remote: &'static str) -> Self {
        Self {
            name,
            remote,
            stringify: true,
        }
    }

    pub const fn unstringified(self) -> Self {
        Self {
            stringify: false,
            ..self
        }
    }
}

pub static CATALOG: [MethodDescriptor; 242] = [
    // upload
    MethodDescriptor::named("wasmOpen"),
    MethodDescriptor::named("wasmClose"),
    MethodDescriptor::named("wasmRead").unstringified(),
    MethodDescriptor::named("getUpload"),
    MethodDescriptor::named("insertUpload"),
    MethodDescriptor::named("updateUpload"),
    MethodDescriptor::named("deleteUpload"),
    MethodDescriptor::named("fileMapSet"),
    MethodDescriptor::named("fileMapClear"),
    MethodDescriptor::named("setSqlWasmPath"),
    MethodDescriptor::named("initDB"),
    MethodDescriptor::named("close"),
    // message
    MethodDescriptor::named("getMessage"),
    MethodDescriptor::named("getMultipleMessage"),
    MethodDescriptor::named("getSendingMessageList"),
    MethodDescriptor::named("getNormalMsgSeq"),
    MethodDescriptor::named("updateMessageTimeAndStatus"),
    MethodDescriptor::named("updateMessage"),
    MethodDescriptor::named("updateMessageBySeq"),
    MethodDescriptor::named("updateColumnsMessage"),
    MethodDescriptor::named("insertMessage"),
    MethodDescriptor::named("batchInsertMessageList"),
    MethodDescriptor::named("getMessageList"),
    MethodDescriptor::named("getMessageListNoTime"),
    MethodDescriptor::named("messageIfExists"),
    MethodDescriptor::named("messageIfExistsBySeq"),
    MethodDescriptor::named("getAbnormalMsgSeq"),
    MethodDescriptor::named("getAbnormalMsgSeqList"),
    MethodDescriptor::named("batchInsertExceptionMsg"),
    MethodDescriptor::named("searchMessageByKeyword"),
    MethodDescriptor::named("searchMessageByContentType"),
    MethodDescriptor::named("searchMessageByContentTypeAndKeyword"),
    MethodDescriptor::named("updateMsgSenderNickname"),
    MethodDescriptor::named("updateMsgSenderFaceURL"),
    MethodDescriptor::named("updateMsgSenderFaceURLAndSenderNickname"),
    MethodDescriptor::named("getMsgSeqByClientMsgID"),
    MethodDescriptor::named("getMsgSeqListByGroupID"),
    MethodDescriptor::named("getMsgSeqListByPeerUserID"),
    MethodDescriptor::named("getMsgSeqListBySelfUserID"),
    MethodDescriptor::named("deleteAllMessage"),
    MethodDescriptor::named("getAllUnDeleteMessageSeqList"),
    MethodDescriptor::named("updateSingleMessageHasRead"),
    MethodDescriptor::named("updateGroupMessageHasRead"),
    MethodDescriptor::named("updateMessageStatusBySourceID"),
    MethodDescriptor::named("getAlreadyExistSeqList"),
    MethodDescriptor::named("getLatestValidServerMessage"),
    MethodDescriptor::named("getMessageBySeq"),
    MethodDescriptor::named("getMessagesByClientMsgIDs"),
    MethodDescriptor::named("getMessagesBySeqs"),
    MethodDescriptor::named("getConversationNormalMsgSeq"),
    MethodDescriptor::aliased("checkConversationNormalMsgSeq", "getConversationNormalMsgSeq"),
    MethodDescriptor::named("getConversationPeerNormalMsgSeq"),
    MethodDescriptor::named("deleteConversationAllMessages"),
    MethodDescriptor::named("markDeleteConversationAllMessages"),
    MethodDescriptor::named("getUnreadMessage"),
    MethodDescriptor::named("markConversationMessageAsReadBySeqs"),
    MethodDescriptor::aliased("markConversationMessageAsReadDB", "markConversationMessageAsRead"),
    MethodDescriptor::named("deleteConversationMsgs"),
    MethodDescriptor::named("markConversationAllMessageAsRead"),
    MethodDescriptor::named("searchAllMessageByContentType"),
    MethodDescriptor::named("insertSendingMessage"),
    MethodDescriptor::named("deleteSendingMessage"),
    MethodDescriptor::named("getAllSendingMessages"),
    // conversation
    MethodDescriptor::aliased("getAllConversationListDB", "getAllConversationList"),
    MethodDescriptor::named("getAllConversationListToSync"),
    MethodDescriptor::named("getHiddenConversationList"),
    MethodDescriptor::named("getConversation"),
    MethodDescriptor::aliased("getMultipleConversationDB", "getMultipleConversation"),
    MethodDescriptor::named("updateColumnsConversation"),
    MethodDescriptor::aliased("updateConversation", "updateColumnsConversation"),
    MethodDescriptor::aliased("updateConversationForSync", "updateColumnsConversation"),
    MethodDescriptor::named("decrConversationUnreadCount"),
    MethodDescriptor::named("batchInsertConversationList"),
    MethodDescriptor::named("insertConversation"),
    MethodDescriptor::aliased("getTotalUnreadMsgCountDB", "getTotalUnreadMsgCount"),
    MethodDescriptor::named("getConversationByUserID"),
    MethodDescriptor::aliased("getConversationListSplitDB", "getConversationListSplit"),
    MethodDescriptor::named("deleteConversation"),
    MethodDescriptor::named("deleteAllConversation"),
    MethodDescriptor::named("batchUpdateConversationList"),
    MethodDescriptor::named("conversationIfExists"),
    MethodDescriptor::named("resetConversation"),
    MethodDescriptor::named("resetAllConversation"),
    MethodDescriptor::named("clearConversation"),
    MethodDescriptor::named("clearAllConversation"),
    MethodDescriptor::aliased("setConversationDraftDB", "setConversationDraft"),
    MethodDescriptor::named("removeConversationDraft"),
    MethodDescriptor::named("unPinConversation"),
    MethodDescriptor::named("incrConversationUnreadCount"),
    MethodDescriptor::named("setMultipleConversationRecvMsgOpt"),
    MethodDescriptor::named("getAllSingleConversationIDList"),
    MethodDescriptor::named("findAllUnreadConversationConversationID"),
    MethodDescriptor::named("getAllConversationIDList"),
    MethodDescriptor::named("getAllConversations"),
    MethodDescriptor::named("searchConversations"),
    MethodDescriptor::named("getLatestActiveMessage"),
    // users
    MethodDescriptor::named("getLoginUser"),
    MethodDescriptor::named("insertLoginUser"),
    MethodDescriptor::named("updateLoginUser"),
    MethodDescriptor::named("getStrangerInfo"),
    MethodDescriptor::named("setStrangerInfo"),
    // app sdk versions
    MethodDescriptor::named("getAppSDKVersion"),
    MethodDescriptor::named("setAppSDKVersion"),
    // versions sync
    MethodDescriptor::named("getVersionSync"),
    MethodDescriptor::named("setVersionSync"),
    MethodDescriptor::named("deleteVersionSync"),
    // super groups
    MethodDescriptor::named("getJoinedSuperGroupList"),
    MethodDescriptor::named("getJoinedSuperGroupIDList"),
    MethodDescriptor::named("getSuperGroupInfoByGroupID"),
    MethodDescriptor::named("deleteSuperGroup"),
    MethodDescriptor::named("insertSuperGroup"),
    MethodDescriptor::named("updateSuperGroup"),
    // unread messages
    MethodDescriptor::named("deleteConversationUnreadMessageList"),
    MethodDescriptor::named("batchInsertConversationUnreadMessageList"),
    // super group messages
    MethodDescriptor::named("superGroupGetMessage"),
    MethodDescriptor::named("superGroupGetMultipleMessage"),
    MethodDescriptor::named("superGroupGetNormalMinSeq"),
    MethodDescriptor::named("getSuperGroupNormalMsgSeq"),
    MethodDescriptor::named("superGroupUpdateMessageTimeAndStatus"),
    MethodDescriptor::named("superGroupUpdateMessage"),
    MethodDescriptor::named("superGroupInsertMessage"),
    MethodDescriptor::named("superGroupBatchInsertMessageList"),
    MethodDescriptor::named("superGroupGetMessageListNoTime"),
    MethodDescriptor::named("superGroupGetMessageList"),
    MethodDescriptor::named("superGroupUpdateColumnsMessage"),
    MethodDescriptor::named("superGroupDeleteAllMessage"),
    MethodDescriptor::named("superGroupSearchMessageByKeyword"),
    MethodDescriptor::named("superGroupSearchMessageByContentType"),
    MethodDescriptor::named("superGroupSearchMessageByContentTypeAndKeyword"),
    MethodDescriptor::named("superGroupUpdateMessageStatusBySourceID"),
    MethodDescriptor::named("superGroupGetSendingMessageList"),
    MethodDescriptor::named("superGroupUpdateGroupMessageHasRead"),
    MethodDescriptor::named("superGroupGetMsgSeqByClientMsgID"),
    MethodDescriptor::named("superGroupSearchAllMessageByContentType"),
    // debug
    MethodDescriptor::named("exec"),
    MethodDescriptor::named("getRowsModified"),
    // black
    MethodDescriptor::aliased("getBlackListDB", "getBlackList"),
    MethodDescriptor::named("getBlackListUserID"),
    MethodDescriptor::named("getBlackInfoByBlockUserID"),
    MethodDescriptor::named("getBlackInfoList"),
    MethodDescriptor::named("insertBlack"),
    MethodDescriptor::named("deleteBlack"),
    MethodDescriptor::named("updateBlack"),
    MethodDescriptor::named("insertFriendRequest"),
    MethodDescriptor::named("deleteFriendRequestBothUserID"),
    MethodDescriptor::named("updateFriendRequest"),
    MethodDescriptor::named("getRecvFriendApplication"),
    MethodDescriptor::named("getSendFriendApplication"),
    MethodDescriptor::named("getFriendApplicationByBothID"),
    MethodDescriptor::named("getBothFriendReq"),
    // friend
    MethodDescriptor::named("insertFriend"),
    MethodDescriptor::aliased("deleteFriendDB", "deleteFriend"),
    MethodDescriptor::named("updateFriend"),
    MethodDescriptor::named("getAllFriendList"),
    MethodDescriptor::named("searchFriendList"),
    MethodDescriptor::named("getFriendInfoByFriendUserID"),
    MethodDescriptor::named("getFriendInfoList"),
    MethodDescriptor::named("getPageFriendList"),
    MethodDescriptor::named("updateColumnsFriend"),
    MethodDescriptor::named("getFriendListCount"),
    MethodDescriptor::named("batchInsertFriend"),
    MethodDescriptor::named("deleteAllFriend"),
    // groups
    MethodDescriptor::named("insertGroup"),
    MethodDescriptor::named("deleteGroup"),
    MethodDescriptor::named("updateGroup"),
    MethodDescriptor::aliased("getJoinedGroupListDB", "getJoinedGroupList"),
    MethodDescriptor::named("getGroupInfoByGroupID"),
    MethodDescriptor::named("getAllGroupInfoByGroupIDOrGroupName"),
    MethodDescriptor::named("subtractMemberCount"),
    MethodDescriptor::named("addMemberCount"),
    MethodDescriptor::named("getJoinedWorkingGroupIDList"),
    MethodDescriptor::named("getJoinedWorkingGroupList"),
    MethodDescriptor::named("getGroupMemberAllGroupIDs"),
    MethodDescriptor::named("getUserJoinedGroupIDs"),
    MethodDescriptor::named("getGroups"),
    MethodDescriptor::named("getGroupMemberListByUserIDs"),
    MethodDescriptor::named("batchInsertGroup"),
    MethodDescriptor::named("deleteAllGroup"),
    MethodDescriptor::named("insertGroupRequest"),
    MethodDescriptor::named("deleteGroupRequest"),
    MethodDescriptor::named("updateGroupRequest"),
    MethodDescriptor::named("getSendGroupApplication"),
    MethodDescriptor::named("insertAdminGroupRequest"),
    MethodDescriptor::named("deleteAdminGroupRequest"),
    MethodDescriptor::named("updateAdminGroupRequest"),
    MethodDescriptor::named("getAdminGroupApplication"),
    MethodDescriptor::named("getGroupMemberInfoByGroupIDUserID"),
    MethodDescriptor::named("getAllGroupMemberList"),
    MethodDescriptor::named("getAllGroupMemberUserIDList"),
    MethodDescriptor::named("getGroupMemberCount"),
    MethodDescriptor::named("getGroupSomeMemberInfo"),
    MethodDescriptor::named("getGroupAdminID"),
    MethodDescriptor::named("getGroupMemberListByGroupID"),
    MethodDescriptor::named("getGroupMemberListSplit"),
    MethodDescriptor::aliased("getGroupMemberOwnerAndAdminDB", "getGroupMemberOwnerAndAdmin"),
    MethodDescriptor::named("getGroupMemberOwner"),
    MethodDescriptor::named("getGroupMemberListSplitByJoinTimeFilter"),
    MethodDescriptor::named("getGroupOwnerAndAdminByGroupID"),
    MethodDescriptor::named("getGroupMemberUIDListByGroupID"),
    MethodDescriptor::named("insertGroupMember"),
    MethodDescriptor::named("batchInsertGroupMember"),
    MethodDescriptor::named("deleteGroupMember"),
    MethodDescriptor::named("deleteGroupAllMembers"),
    MethodDescriptor::named("updateGroupMember"),
    MethodDescriptor::named("updateGroupMemberField"),
    MethodDescriptor::aliased("searchGroupMembersDB", "searchGroupMembers"),
    // group read cursor
    MethodDescriptor::named("insertGroupReadCursor"),
    MethodDescriptor::named("getGroupReadCursor"),
    MethodDescriptor::named("getGroupReadCursorsByConversationID"),
    MethodDescriptor::named("updateGroupReadCursor"),
    MethodDescriptor::named("deleteGroupReadCursor"),
    MethodDescriptor::named("deleteGroupReadCursorsByConversationID"),
    MethodDescriptor::named("upsertGroupReadCursor"),
    MethodDescriptor::named("getMinReadSeqFromCursors"),
    // group read cursor state
    MethodDescriptor::named("insertGroupReadCursorState"),
    MethodDescriptor::named("getGroupReadCursorState"),
    MethodDescriptor::named("deleteGroupReadCursorState"),
    MethodDescriptor::named("incrementGroupReadCursorVersion"),
    // group read state
    MethodDescriptor::named("getGroupReadState"),
    MethodDescriptor::named("upsertGroupReadState"),
    MethodDescriptor::named("updateGroupReadStateMinSeq"),
    MethodDescriptor::named("deleteGroupReadState"),
    MethodDescriptor::named("refreshGroupReadState"),
    // read cursor
    MethodDescriptor::named("insertReadCursor"),
    MethodDescriptor::named("getReadCursor"),
    MethodDescriptor::named("getReadCursorsByConversationID"),
    MethodDescriptor::named("updateReadCursor"),
    MethodDescriptor::named("deleteReadCursor"),
    MethodDescriptor::named("deleteReadCursorsByConversationID"),
    MethodDescriptor::named("upsertReadCursor"),
    MethodDescriptor::named("getAllReadSeqFromCursors"),
    // read state
    MethodDescriptor::named("getReadStateDB"),
    MethodDescriptor::named("upsertReadStateDB"),
    MethodDescriptor::named("updateReadStateAllReadSeqDB"),
    MethodDescriptor::named("deleteReadStateDB"),
    MethodDescriptor::named("refreshReadState"),
    // temp cache chat logs
    MethodDescriptor::named("batchInsertTempCacheMessageList"),
    MethodDescriptor::named("InsertTempCacheMessage"),
    // notification
    MethodDescriptor::named("getNotificationAllSeqs"),
    MethodDescriptor::named("setNotificationSeq"),
    MethodDescriptor::named("batchInsertNotificationSeq"),
    MethodDescriptor::named("getExistedTables"),
];

pub fn lookup(name: &str) -> Option<&'static MethodDescriptor> {
    CATALOG.iter().find(|m| m.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HOSTED_METHODS;
    use std::collections::HashSet;

    #[test]
    fn test_exposed_names_are_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_every_hosted_method_is_exposed_under_its_own_name() {
        for method in HOSTED_METHODS {
            let descriptor = lookup(method).unwrap_or_else(|| panic!("{} missing", method));
            assert_eq!(descriptor.remote, method);
            assert!(descriptor.stringify);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(lookup("updateConversation").unwrap().remote, "updateColumnsConversation");
        assert_eq!(
            lookup("updateConversationForSync").unwrap().remote,
            "updateColumnsConversation"
        );
        assert_eq!(
            lookup("checkConversationNormalMsgSeq").unwrap().remote,
            "getConversationNormalMsgSeq"
        );
        assert_eq!(lookup("getBlackListDB").unwrap().remote, "getBlackList");
    }

    #[test]
    fn test_wasm_read_is_not_stringified() {
        assert!(!lookup("wasmRead").unwrap().stringify);
        assert!(lookup("wasmOpen").unwrap().stringify);
        assert!(lookup("noSuchMethod").is_none());
    }
}
